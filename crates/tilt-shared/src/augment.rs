//! Augmentation pipeline: deterministic personalization of a base reply.
//!
//! Every draw comes from a [`SeededRng`] built from the raw input and the
//! day of year. Same input, same day, same output.
//!
//! Steps, in order:
//! 1. entity/theme extraction (no randomness)
//! 2. synonym substitution, at most two per reply
//! 3. punctuation variance
//! 4. optional intro clause
//! 5. optional outro clause
//! 6. compose under the length cap
//!
//! Any failure returns the base reply unchanged.

use crate::entities::{extract, Entities, Relation, Theme};
use crate::error::{Result, TiltError};
use crate::seeded::SeededRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Hard cap on the composed reply, in characters
pub const MAX_REPLY_CHARS: usize = 200;

/// Substitutions allowed per reply
const MAX_SUBSTITUTIONS: usize = 2;

/// Chance of turning the first mid-text period into an em-dash
const DASH_CHANCE: f64 = 0.25;

const SYNONYMS: &[(&str, &[&str])] = &[
    ("small", &["tiny", "modest"]),
    ("breathe", &["pause", "exhale"]),
    ("loss", &["hit", "drawdown"]),
    ("plan", &["playbook", "script"]),
    ("step", &["walk"]),
    ("calm", &["steady", "cool"]),
    ("big", &["large", "heavy"]),
    ("rest", &["sleep", "recharge"]),
    ("review", &["revisit", "replay"]),
    ("quick", &["fast"]),
    ("tomorrow", &["next session"]),
    ("trade", &["position", "entry"]),
];

/// Reply voice. Only changes how often synonyms are swapped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Blunt,
    #[default]
    Coach,
    Deadpan,
}

impl Style {
    fn synonym_chance(&self) -> f64 {
        match self {
            Style::Blunt => 0.15,
            Style::Coach | Style::Deadpan => 0.35,
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Style::Blunt => "blunt",
            Style::Coach => "coach",
            Style::Deadpan => "deadpan",
        };
        f.write_str(name)
    }
}

impl FromStr for Style {
    type Err = TiltError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "blunt" => Ok(Style::Blunt),
            "coach" => Ok(Style::Coach),
            "deadpan" => Ok(Style::Deadpan),
            other => Err(TiltError::Internal(format!("unknown style: {}", other))),
        }
    }
}

/// Turns base replies into personalized variants.
#[derive(Debug, Clone, Copy, Default)]
pub struct Augmenter {
    style: Style,
}

impl Augmenter {
    pub fn new(style: Style) -> Self {
        Self { style }
    }

    pub fn style(&self) -> Style {
        self.style
    }

    /// Augment `base` for `input` on `day_of_year`. Falls back to `base`
    /// on any failure or an empty result.
    pub fn augment(&self, base: &str, input: &str, day_of_year: u32) -> String {
        match self.try_augment(base, input, day_of_year) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!("Augmentation produced empty text, using base reply");
                base.to_string()
            }
            Err(e) => {
                warn!("Augmentation failed ({}: {}), using base reply", e.code(), e);
                base.to_string()
            }
        }
    }

    fn try_augment(&self, base: &str, input: &str, day_of_year: u32) -> Result<String> {
        let core = base.trim();
        if core.is_empty() {
            return Err(TiltError::EmptyCore);
        }

        let mut rng = SeededRng::new(input, day_of_year);
        let entities = extract(input);

        let core = substitute_synonyms(core, self.style.synonym_chance(), &mut rng);
        let core = vary_punctuation(&core, &mut rng);
        let intro = intro_clause(&entities, &mut rng);
        let outro = outro_clause(&entities, &core, &mut rng);

        debug!(
            "Augment: themes={:?} ticker={:?} intro={} outro={}",
            entities.themes,
            entities.ticker,
            intro.is_some(),
            outro.is_some()
        );

        compose(intro.as_deref(), &core, outro.as_deref())
    }
}

/// Swap up to [`MAX_SUBSTITUTIONS`] table words for a synonym, keeping case.
fn substitute_synonyms(text: &str, chance: f64, rng: &mut SeededRng) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();
    let mut swaps = 0;

    for c in text.chars() {
        if c.is_alphabetic() {
            word.push(c);
        } else {
            flush_word(&mut word, &mut out, rng, chance, &mut swaps);
            out.push(c);
        }
    }
    flush_word(&mut word, &mut out, rng, chance, &mut swaps);

    out
}

fn flush_word(
    word: &mut String,
    out: &mut String,
    rng: &mut SeededRng,
    chance: f64,
    swaps: &mut usize,
) {
    if word.is_empty() {
        return;
    }
    let replacement = if *swaps < MAX_SUBSTITUTIONS {
        lookup_synonyms(word.as_str())
            .filter(|_| rng.chance(chance))
            .and_then(|options| rng.pick(options))
            .map(|syn| match_case(word.as_str(), syn))
    } else {
        None
    };
    match replacement {
        Some(syn) => {
            *swaps += 1;
            out.push_str(&syn);
        }
        None => out.push_str(word),
    }
    word.clear();
}

fn lookup_synonyms(word: &str) -> Option<&'static [&'static str]> {
    let lower = word.to_lowercase();
    SYNONYMS
        .iter()
        .find(|(key, _)| *key == lower)
        .map(|(_, options)| *options)
}

/// Apply the capitalization of `original` to `replacement`.
fn match_case(original: &str, replacement: &str) -> String {
    let letters: Vec<char> = original.chars().collect();
    if letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()) {
        return replacement.to_uppercase();
    }
    if letters.first().map_or(false, |c| c.is_uppercase()) {
        let mut chars = replacement.chars();
        return match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
    }
    replacement.to_string()
}

/// Either dash-join the first two sentences or ensure terminal punctuation.
fn vary_punctuation(text: &str, rng: &mut SeededRng) -> String {
    if rng.chance(DASH_CHANCE) {
        if let Some(dashed) = dash_first_period(text) {
            return dashed;
        }
    }
    ensure_terminal(text)
}

fn dash_first_period(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let pos = (0..bytes.len()).find(|&i| {
        bytes[i] == b'.'
            && bytes.get(i + 1).map_or(false, |b| b.is_ascii_whitespace())
            && text[i + 1..].trim_start().chars().next().is_some()
    })?;

    let head = &text[..pos];
    let rest = text[pos + 1..].trim_start();
    let next_word = rest.split_whitespace().next().unwrap_or("");
    let keep_case = next_word == "I"
        || next_word.starts_with("I'")
        || (next_word.chars().count() > 1 && next_word.chars().all(|c| !c.is_lowercase()));

    let rest = if keep_case {
        rest.to_string()
    } else {
        let mut chars = rest.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    };

    Some(format!("{} — {}", head, rest))
}

fn ensure_terminal(text: &str) -> String {
    let trimmed = text.trim_end();
    if trimmed.ends_with(['.', '!', '?']) {
        trimmed.to_string()
    } else {
        format!("{}.", trimmed)
    }
}

fn intro_clause(entities: &Entities, rng: &mut SeededRng) -> Option<String> {
    let chance = if entities.ticker.is_some() {
        0.6
    } else if !entities.themes.is_empty() {
        0.4
    } else {
        0.15
    };
    if !rng.chance(chance) {
        return None;
    }

    if let Some(ticker) = &entities.ticker {
        let templates = ["Re {}:", "{}, huh:"];
        return rng.pick(&templates).map(|t| t.replace("{}", ticker));
    }

    if let Some(theme) = entities.first_theme() {
        let line = if entities.has(Relation::Family) {
            format!("On {}, with family in the picture:", theme)
        } else if entities.has(Relation::Work) {
            format!("On {}, on top of work:", theme)
        } else {
            format!("On {}:", theme)
        };
        return Some(line);
    }

    let options: &[&str] = if entities.has(Relation::Family) {
        &["With family in the mix:", "Family money is heavier money:"]
    } else if entities.has(Relation::Work) {
        &["Between work and the charts:", "Work stress leaks into trades:"]
    } else if let Some(amount) = entities.amounts.first() {
        return Some(format!("About that {}:", amount));
    } else {
        &["Real talk:", "Okay:", "Look:"]
    };
    rng.pick(options).map(|s| s.to_string())
}

fn outro_phrases(theme: Option<Theme>) -> &'static [&'static str] {
    match theme {
        Some(Theme::Revenge) => &["No revenge trades today.", "The market owes you nothing."],
        Some(Theme::Budget) => &["Cap the daily loss.", "Rent money stays off the screen."],
        Some(Theme::Sleep) => &["Sleep before the next entry.", "Charts will be there tomorrow."],
        Some(Theme::Journal) => &["Write it down tonight.", "Log the why, not just the P&L."],
        Some(Theme::Exit) => &["Set the exit first.", "Exits before entries."],
        Some(Theme::Size) => &["Halve the size.", "Size so you can sleep."],
        Some(Theme::Discipline) => &["Follow the plan.", "Rules over vibes."],
        Some(Theme::Emotions) => &[
            "Name the feeling, then act.",
            "Feelings are data, not signals.",
        ],
        Some(Theme::Risk) => &["Guardrail: size small.", "Defined risk only."],
        None => &["One trade at a time.", "Log off for a bit."],
    }
}

fn outro_clause(entities: &Entities, core: &str, rng: &mut SeededRng) -> Option<String> {
    let chance = if entities.themes.is_empty() { 0.1 } else { 0.5 };
    if !rng.chance(chance) {
        return None;
    }
    let phrase = rng.pick(outro_phrases(entities.first_theme()))?;
    if core.to_lowercase().contains(&phrase.to_lowercase()) {
        return None;
    }
    Some(phrase.to_string())
}

/// Join `intro core outro` under [`MAX_REPLY_CHARS`]. Outro goes first,
/// then intro; the core is only cut when it alone exceeds the cap.
fn compose(intro: Option<&str>, core: &str, outro: Option<&str>) -> Result<String> {
    if core.trim().is_empty() {
        return Err(TiltError::EmptyCore);
    }

    let join = |intro: Option<&str>, outro: Option<&str>| {
        intro
            .into_iter()
            .chain(std::iter::once(core))
            .chain(outro)
            .collect::<Vec<_>>()
            .join(" ")
    };

    for (i, o) in [(intro, outro), (intro, None), (None, None)] {
        let text = join(i, o);
        if text.chars().count() <= MAX_REPLY_CHARS {
            return Ok(text);
        }
    }

    Ok(core
        .chars()
        .take(MAX_REPLY_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_same_day() {
        let aug = Augmenter::new(Style::Coach);
        let input = "revenge traded $PEPE after a 2k loss";
        let base = "Breathe. Take a small step back and review the plan";
        assert_eq!(aug.augment(base, input, 200), aug.augment(base, input, 200));
    }

    #[test]
    fn test_core_survives() {
        let aug = Augmenter::new(Style::Blunt);
        let out = aug.augment("Walk away from the screen", "hello", 42);
        assert!(out.contains("from the screen"));
    }

    #[test]
    fn test_never_exceeds_cap() {
        let aug = Augmenter::new(Style::Coach);
        let long = "word ".repeat(80);
        for day in 1..=30 {
            let out = aug.augment(&long, "risk on $WIF with family money", day);
            assert!(out.chars().count() <= MAX_REPLY_CHARS);
            assert!(!out.is_empty());
        }
    }

    #[test]
    fn test_empty_base_falls_back() {
        let aug = Augmenter::default();
        assert_eq!(aug.augment("   ", "anything", 1), "   ");
    }

    #[test]
    fn test_compose_drops_outro_then_intro() {
        let core = "c".repeat(190);
        let out = compose(Some("Re $WIF:"), &core, Some("Halve the size.")).unwrap();
        assert_eq!(out, format!("Re $WIF: {}", core));

        let core = "c".repeat(195);
        let out = compose(Some("Re $WIF:"), &core, Some("Halve the size.")).unwrap();
        assert_eq!(out, core);
    }

    #[test]
    fn test_compose_cuts_core_last() {
        let core = "c".repeat(250);
        let out = compose(None, &core, None).unwrap();
        assert_eq!(out.chars().count(), MAX_REPLY_CHARS);
    }

    #[test]
    fn test_compose_all_parts() {
        let out = compose(Some("On risk:"), "Size down.", Some("Defined risk only.")).unwrap();
        assert_eq!(out, "On risk: Size down. Defined risk only.");
    }

    #[test]
    fn test_match_case() {
        assert_eq!(match_case("Small", "tiny"), "Tiny");
        assert_eq!(match_case("SMALL", "tiny"), "TINY");
        assert_eq!(match_case("small", "tiny"), "tiny");
    }

    #[test]
    fn test_ensure_terminal() {
        assert_eq!(ensure_terminal("size down"), "size down.");
        assert_eq!(ensure_terminal("size down!"), "size down!");
        assert_eq!(ensure_terminal("size down?  "), "size down?");
    }

    #[test]
    fn test_dash_first_period() {
        assert_eq!(
            dash_first_period("Breathe. Then size down.").as_deref(),
            Some("Breathe — then size down.")
        );
        assert_eq!(
            dash_first_period("Stop. I mean it.").as_deref(),
            Some("Stop — I mean it.")
        );
        assert_eq!(dash_first_period("Only one sentence."), None);
    }

    #[test]
    fn test_substitution_limit() {
        let mut rng = SeededRng::new("x", 1);
        let text = "small small small small small small";
        let out = substitute_synonyms(text, 1.0, &mut rng);
        let kept = out.split(' ').filter(|w| *w == "small").count();
        assert_eq!(kept, 4);
    }

    #[test]
    fn test_substitution_zero_chance_is_identity() {
        let mut rng = SeededRng::new("x", 1);
        let text = "Take a small step, review the plan.";
        assert_eq!(substitute_synonyms(text, 0.0, &mut rng), text);
    }

    fn intros(input: &str) -> Vec<Option<String>> {
        let entities = extract(input);
        (1..=366)
            .map(|day| intro_clause(&entities, &mut SeededRng::new(input, day)))
            .collect()
    }

    fn outros(input: &str, core: &str) -> Vec<Option<String>> {
        let entities = extract(input);
        (1..=366)
            .map(|day| outro_clause(&entities, core, &mut SeededRng::new(input, day)))
            .collect()
    }

    /// Every produced clause is allowed, and every allowed clause shows up.
    fn assert_covers(produced: &[Option<String>], allowed: &[&str]) {
        for clause in produced.iter().flatten() {
            assert!(
                allowed.contains(&clause.as_str()),
                "unexpected clause {:?}",
                clause
            );
        }
        for expected in allowed {
            assert!(
                produced.iter().flatten().any(|c| c == expected),
                "{:?} never produced",
                expected
            );
        }
        assert!(produced.iter().any(Option::is_none));
    }

    #[test]
    fn test_intro_ticker() {
        assert_covers(&intros("aped into $wif again"), &["Re $WIF:", "$WIF, huh:"]);
    }

    #[test]
    fn test_intro_theme() {
        assert_covers(&intros("can't sleep at all"), &["On sleep:"]);
        assert_covers(
            &intros("my wife is up and I can't sleep"),
            &["On sleep, with family in the picture:"],
        );
        assert_covers(
            &intros("boss kept me late, can't sleep"),
            &["On sleep, on top of work:"],
        );
    }

    #[test]
    fn test_intro_without_theme() {
        assert_covers(
            &intros("my wife asked me about it"),
            &["With family in the mix:", "Family money is heavier money:"],
        );
        assert_covers(
            &intros("the boss asked me about it"),
            &["Between work and the charts:", "Work stress leaks into trades:"],
        );
        assert_covers(&intros("down 2k today"), &["About that 2k:"]);
        assert_covers(&intros("hello there"), &["Real talk:", "Okay:", "Look:"]);
    }

    #[test]
    fn test_outro_follows_first_theme() {
        assert_covers(
            &outros("lost on a memecoin", "Breathe."),
            &["Guardrail: size small.", "Defined risk only."],
        );
        assert_covers(
            &outros("hello there", "Breathe."),
            &["One trade at a time.", "Log off for a bit."],
        );
    }

    #[test]
    fn test_outro_skipped_when_core_has_it() {
        assert_covers(
            &outros("lost on a memecoin", "Size down. Defined risk only."),
            &["Guardrail: size small."],
        );
    }

    #[test]
    fn test_style_parse() {
        assert_eq!("Blunt".parse::<Style>().unwrap(), Style::Blunt);
        assert!("loud".parse::<Style>().is_err());
    }
}
