//! JSON with comments.
//!
//! Datasets are hand-edited and carry `//` and `/* */` comments. These are
//! stripped outside string literals before handing the text to serde_json.

use crate::error::Result;
use serde::de::DeserializeOwned;

/// Remove line and block comments that sit outside string literals.
/// Newlines ending a line comment are kept so serde_json error positions
/// still point at the right line.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    if skipped == '\n' {
                        out.push('\n');
                    }
                    prev = skipped;
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Strip comments and deserialize.
pub fn parse_jsonc<T: DeserializeOwned>(text: &str) -> Result<T> {
    let cleaned = strip_comments(text);
    Ok(serde_json::from_str(&cleaned)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_line_comments() {
        let text = "[\n  \"a\", // first\n  \"b\"\n]";
        let parsed: Vec<String> = parse_jsonc(text).unwrap();
        assert_eq!(parsed, vec!["a", "b"]);
    }

    #[test]
    fn test_strips_block_comments() {
        let text = "/* header\n spans lines */ [\"a\", /* inline */ \"b\"]";
        let parsed: Vec<String> = parse_jsonc(text).unwrap();
        assert_eq!(parsed, vec!["a", "b"]);
    }

    #[test]
    fn test_keeps_comment_markers_inside_strings() {
        let text = r#"["http://example.com", "a /* not */ b"]"#;
        let parsed: Vec<String> = parse_jsonc(text).unwrap();
        assert_eq!(parsed[0], "http://example.com");
        assert_eq!(parsed[1], "a /* not */ b");
    }

    #[test]
    fn test_escaped_quote_does_not_end_string() {
        let text = r#"["say \"hi\" // still string"] // gone"#;
        let parsed: Vec<String> = parse_jsonc(text).unwrap();
        assert_eq!(parsed[0], "say \"hi\" // still string");
    }

    #[test]
    fn test_unterminated_block_eats_rest() {
        assert_eq!(strip_comments("[1] /* never closed"), "[1] ");
    }

    #[test]
    fn test_malformed_is_error() {
        let parsed: Result<Vec<String>> = parse_jsonc("[\"a\", // trailing\n");
        assert!(parsed.is_err());
    }
}
