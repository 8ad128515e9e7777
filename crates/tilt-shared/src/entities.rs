//! Entity and theme extraction from raw input.
//!
//! Pure pattern matching. Recomputed for every input and never stored.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static TICKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$([A-Za-z0-9]{2,16})\b").expect("valid ticker regex"));

static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^A-Za-z0-9$])(\$?\d+(?:[.,]\d+)?(?:k|m)?)\b")
        .expect("valid amount regex")
});

const FAMILY_WORDS: &[&str] = &[
    "wife", "husband", "kids", "kid", "mom", "dad", "family", "partner", "son", "daughter",
    "girlfriend", "boyfriend",
];

const WORK_WORDS: &[&str] = &["boss", "job", "work", "office", "shift", "coworker", "salary"];

/// Closed theme vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Theme {
    Revenge,
    Budget,
    Sleep,
    Journal,
    Exit,
    Size,
    Discipline,
    Emotions,
    Risk,
}

impl Theme {
    /// Detection order
    pub const ALL: [Theme; 9] = [
        Theme::Revenge,
        Theme::Budget,
        Theme::Sleep,
        Theme::Journal,
        Theme::Exit,
        Theme::Size,
        Theme::Discipline,
        Theme::Emotions,
        Theme::Risk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Revenge => "revenge",
            Theme::Budget => "budget",
            Theme::Sleep => "sleep",
            Theme::Journal => "journal",
            Theme::Exit => "exit",
            Theme::Size => "size",
            Theme::Discipline => "discipline",
            Theme::Emotions => "emotions",
            Theme::Risk => "risk",
        }
    }

    /// Substring keywords (matched against lowercased input)
    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Theme::Revenge => &["revenge", "win it back", "make it back", "get it back", "payback"],
            Theme::Budget => &["budget", "rent", "savings", "bills", "afford", "paycheck"],
            Theme::Sleep => &["sleep", "tired", "insomnia", "3am", "all night", "exhausted"],
            Theme::Journal => &["journal", "notes", "diary", "write down", "wrote down"],
            Theme::Exit => &["exit", "take profit", "stop loss", "stop-loss", "sold", "sell"],
            Theme::Size => &["size", "leverage", "all in", "all-in", "100x", "position"],
            Theme::Discipline => &["discipline", "rules", "plan", "fomo", "impulse", "chased"],
            Theme::Emotions => &["angry", "sad", "anxious", "scared", "panic", "stress", "feel"],
            Theme::Risk => &["risk", "memecoin", "degen", "liquidat", "margin", "rug"],
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship or context hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Family,
    Work,
}

/// Everything pulled out of one input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entities {
    /// First `$TICKER`, uppercased, with its `$`
    pub ticker: Option<String>,
    /// Amounts such as `2k` or `$150k`, in input order
    pub amounts: Vec<String>,
    pub relations: Vec<Relation>,
    /// Detected themes in vocabulary order
    pub themes: Vec<Theme>,
}

impl Entities {
    pub fn first_theme(&self) -> Option<Theme> {
        self.themes.first().copied()
    }

    pub fn has(&self, relation: Relation) -> bool {
        self.relations.contains(&relation)
    }
}

/// Extract ticker, amounts, relation hints and themes.
pub fn extract(input: &str) -> Entities {
    let lower = input.to_lowercase();

    let ticker = TICKER_RE
        .captures(input)
        .and_then(|c| c.get(1))
        .map(|m| format!("${}", m.as_str().to_uppercase()));

    let amounts = AMOUNT_RE
        .captures_iter(input)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
        .filter(|a| a.ends_with('k') || a.ends_with('m') || a.starts_with('$'))
        .collect();

    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let mut relations = Vec::new();
    if words.iter().any(|w| FAMILY_WORDS.contains(w)) {
        relations.push(Relation::Family);
    }
    if words.iter().any(|w| WORK_WORDS.contains(w)) {
        relations.push(Relation::Work);
    }

    let themes = Theme::ALL
        .iter()
        .copied()
        .filter(|t| t.keywords().iter().any(|k| lower.contains(k)))
        .collect();

    Entities {
        ticker,
        amounts,
        relations,
        themes,
    }
}
