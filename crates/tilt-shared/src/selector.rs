//! Reply selector: best prompt by lexical score, then a non-repeating pick
//! from that prompt's reply bank.

use crate::catalog::PromptCatalog;
use crate::lexical::{score_sets, tokenize};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Where a base reply came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Picked from the best-matching prompt's bank
    Prompt {
        prompt: String,
        index: usize,
        text: String,
    },
    /// Picked from the catalog-wide pool
    Pool { text: String },
    /// Catalog empty or not loaded
    Unavailable,
}

impl Selection {
    pub fn text(&self) -> Option<&str> {
        match self {
            Selection::Prompt { text, .. } | Selection::Pool { text } => Some(text),
            Selection::Unavailable => None,
        }
    }

    pub fn prompt(&self) -> Option<&str> {
        match self {
            Selection::Prompt { prompt, .. } => Some(prompt),
            _ => None,
        }
    }
}

/// Per-prompt record of response indices already served this cycle.
#[derive(Debug, Clone, Default)]
pub struct UsageState {
    used: HashMap<String, HashSet<usize>>,
}

impl UsageState {
    pub fn used(&self, prompt: &str) -> Option<&HashSet<usize>> {
        self.used.get(prompt)
    }

    fn mark(&mut self, prompt: &str, index: usize) {
        self.used.entry(prompt.to_string()).or_default().insert(index);
    }

    fn reset(&mut self, prompt: &str) {
        self.used.remove(prompt);
    }
}

/// Chooses base replies. Owns the usage state and its own randomness.
#[derive(Debug)]
pub struct ReplySelector {
    usage: UsageState,
    rng: StdRng,
}

impl ReplySelector {
    pub fn new() -> Self {
        Self {
            usage: UsageState::default(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic selector for tests and replays
    pub fn with_seed(seed: u64) -> Self {
        Self {
            usage: UsageState::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn usage(&self) -> &UsageState {
        &self.usage
    }

    /// Highest-scoring prompt with score > 0. First maximum wins on ties.
    pub fn find_best_prompt<'c>(&self, catalog: &'c PromptCatalog, input: &str) -> Option<&'c str> {
        let input_tokens: BTreeSet<String> = tokenize(input).into_iter().collect();
        if input_tokens.is_empty() {
            return None;
        }

        let mut best: Option<(&str, f64)> = None;
        for prompt in catalog.prompts() {
            let Some(tokens) = catalog.prompt_tokens(prompt) else {
                continue;
            };
            let s = score_sets(&input_tokens, tokens);
            if s > 0.0 && best.map_or(true, |(_, top)| s > top) {
                best = Some((prompt.as_str(), s));
            }
        }

        if let Some((prompt, s)) = best {
            debug!("Best prompt {:?} (score {:.3})", prompt, s);
        }
        best.map(|(prompt, _)| prompt)
    }

    /// Pick an unused response index for the prompt. When every index has
    /// been served, pick from all of them and start a fresh cycle.
    pub fn pick_from_prompt(
        &mut self,
        catalog: &PromptCatalog,
        prompt: &str,
    ) -> Option<(usize, String)> {
        let responses = catalog.responses(prompt)?;
        if responses.is_empty() {
            return None;
        }

        let used = self.usage.used(prompt);
        let unused: Vec<usize> = (0..responses.len())
            .filter(|i| used.map_or(true, |u| !u.contains(i)))
            .collect();

        let index = match unused.choose(&mut self.rng) {
            Some(&i) => i,
            None => {
                self.usage.reset(prompt);
                self.rng.gen_range(0..responses.len())
            }
        };

        self.usage.mark(prompt, index);
        if self.usage.used(prompt).map_or(0, HashSet::len) == responses.len() {
            self.usage.reset(prompt);
        }

        Some((index, responses[index].clone()))
    }

    /// Uniform pick from the catalog-wide pool.
    pub fn pick_from_pool(&mut self, catalog: &PromptCatalog) -> Option<String> {
        catalog.pool().choose(&mut self.rng).cloned()
    }

    /// Best prompt, then its bank, then the pool, then `Unavailable`.
    pub fn select_base(&mut self, catalog: &PromptCatalog, input: &str) -> Selection {
        if let Some(prompt) = self.find_best_prompt(catalog, input) {
            if let Some((index, text)) = self.pick_from_prompt(catalog, prompt) {
                return Selection::Prompt {
                    prompt: prompt.to_string(),
                    index,
                    text,
                };
            }
        }

        match self.pick_from_pool(catalog) {
            Some(text) => Selection::Pool { text },
            None => Selection::Unavailable,
        }
    }
}

impl Default for ReplySelector {
    fn default() -> Self {
        Self::new()
    }
}
