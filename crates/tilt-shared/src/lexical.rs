//! Lexical scorer: tokenization and cosine-style overlap.
//!
//! Tokens are lowercase alphanumeric runs. A literal `$` is kept as its own
//! token so ticker-heavy inputs overlap with ticker-heavy prompts.

use std::collections::BTreeSet;

/// Tokenize text for scoring.
/// Lowercase, keep alphanumeric runs and `$`, drop all other punctuation.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        if c.is_alphanumeric() {
            current.extend(c.to_lowercase());
            continue;
        }
        if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        if c == '$' {
            tokens.push("$".to_string());
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Set-based overlap score in [0, 1]: |A ∩ B| / sqrt(|A| · |B|).
pub fn score(a: &str, b: &str) -> f64 {
    let left: BTreeSet<String> = tokenize(a).into_iter().collect();
    let right: BTreeSet<String> = tokenize(b).into_iter().collect();
    score_sets(&left, &right)
}

/// Score two pre-tokenized sets.
pub fn score_sets(left: &BTreeSet<String>, right: &BTreeSet<String>) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(right).count() as f64;
    shared / ((left.len() * right.len()) as f64).sqrt()
}
