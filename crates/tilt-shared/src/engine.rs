//! Response engine: the one call callers make.
//!
//! `get_reply` is synchronous over in-memory state and never fails. A
//! missing catalog, an empty catalog and augmentation faults all degrade to
//! a sentinel or the unaugmented reply.

use crate::augment::{Augmenter, Style};
use crate::catalog::{CatalogStatus, PromptCatalog};
use crate::config::EngineConfig;
use crate::recent::RecentOutputBuffer;
use crate::seeded::today_ordinal;
use crate::selector::{ReplySelector, Selection};
use tracing::{debug, info, warn};

/// Returned while the catalog has not loaded (or failed to)
pub const NOT_READY_REPLY: &str = "Still warming up. Give me a second and try again.";

/// Returned when the catalog has nothing to offer
pub const NO_MATCH_REPLY: &str = "Nothing on file for that one. Say it another way?";

/// Extra attempts when the reply was emitted recently
const DEDUP_RETRIES: usize = 2;

/// Where a reply came from
#[derive(Debug, Clone, PartialEq)]
pub enum ReplySource {
    /// Best-matching prompt
    Prompt(String),
    /// Catalog-wide fallback pool
    Pool,
    NotReady,
    NoMatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
}

impl Reply {
    fn sentinel(text: &str, source: ReplySource) -> Self {
        Self {
            text: text.to_string(),
            source,
        }
    }
}

/// Selector + augmenter + recent-output de-duplication.
/// All state belongs to this instance.
#[derive(Debug)]
pub struct ResponseEngine {
    config: EngineConfig,
    status: CatalogStatus,
    catalog: Option<PromptCatalog>,
    selector: ReplySelector,
    augmenter: Augmenter,
    recent: RecentOutputBuffer,
    fixed_day: Option<u32>,
}

impl ResponseEngine {
    /// Engine that is not ready until `load` completes.
    pub fn new(config: EngineConfig) -> Self {
        let augmenter = Augmenter::new(config.style);
        Self {
            config,
            status: CatalogStatus::Pending,
            catalog: None,
            selector: ReplySelector::new(),
            augmenter,
            recent: RecentOutputBuffer::new(),
            fixed_day: None,
        }
    }

    /// Engine that is ready immediately.
    pub fn with_catalog(catalog: PromptCatalog, style: Style) -> Self {
        let config = EngineConfig {
            style,
            ..EngineConfig::default()
        };
        let mut engine = Self::new(config);
        engine.install(catalog);
        engine
    }

    /// Deterministic selector
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.selector = ReplySelector::with_seed(seed);
        self
    }

    /// Pin the augmentation day instead of reading the clock
    pub fn with_fixed_day(mut self, day_of_year: u32) -> Self {
        self.fixed_day = Some(day_of_year);
        self
    }

    /// Load the datasets. Already-ready engines return immediately;
    /// failures leave the engine answering with the not-ready sentinel.
    pub async fn load(&mut self) -> &CatalogStatus {
        if self.status.is_ready() {
            return &self.status;
        }
        let paths = self.config.dataset_paths();
        let result = PromptCatalog::load(&paths).await;
        self.finish_load(result)
    }

    /// Blocking variant of [`load`](Self::load)
    pub fn load_blocking(&mut self) -> &CatalogStatus {
        if self.status.is_ready() {
            return &self.status;
        }
        let paths = self.config.dataset_paths();
        let result = PromptCatalog::load_blocking(&paths);
        self.finish_load(result)
    }

    fn finish_load(&mut self, result: crate::error::Result<PromptCatalog>) -> &CatalogStatus {
        match result {
            Ok(catalog) => self.install(catalog),
            Err(e) => {
                warn!("Catalog unavailable ({}), engine degraded: {}", e.code(), e);
                self.status = CatalogStatus::Unavailable {
                    reason: e.to_string(),
                };
            }
        }
        &self.status
    }

    fn install(&mut self, catalog: PromptCatalog) {
        self.status = catalog.status();
        info!("Engine ready ({:?})", self.status);
        self.catalog = Some(catalog);
    }

    pub fn status(&self) -> &CatalogStatus {
        &self.status
    }

    pub fn is_ready(&self) -> bool {
        self.catalog.is_some()
    }

    pub fn style(&self) -> Style {
        self.augmenter.style()
    }

    pub fn recent(&self) -> &RecentOutputBuffer {
        &self.recent
    }

    /// Example inputs from the optional dataset
    pub fn sample_inputs(&self) -> &[String] {
        self.catalog
            .as_ref()
            .map(PromptCatalog::sample_inputs)
            .unwrap_or(&[])
    }

    /// Reply text for `input`. Never empty, never fails.
    pub fn get_reply(&mut self, input: &str) -> String {
        self.resolve(input).text
    }

    /// Reply text plus where it came from.
    pub fn resolve(&mut self, input: &str) -> Reply {
        let Some(catalog) = self.catalog.as_ref() else {
            return Reply::sentinel(NOT_READY_REPLY, ReplySource::NotReady);
        };
        let day = self.fixed_day.unwrap_or_else(today_ordinal);

        let selection = self.selector.select_base(catalog, input);
        let (source, base) = match &selection {
            Selection::Prompt { prompt, text, .. } => (ReplySource::Prompt(prompt.clone()), text),
            Selection::Pool { text } => (ReplySource::Pool, text),
            Selection::Unavailable => {
                return Reply::sentinel(NO_MATCH_REPLY, ReplySource::NoMatch);
            }
        };

        let mut text = self.augmenter.augment(base, input, day);

        if let Some(prompt) = selection.prompt() {
            for attempt in 0..DEDUP_RETRIES {
                if !self.recent.contains(&text) {
                    break;
                }
                debug!("Reply was recent, retry {} on {:?}", attempt + 1, prompt);
                match self.selector.pick_from_prompt(catalog, prompt) {
                    Some((_, base)) => text = self.augmenter.augment(&base, input, day),
                    None => break,
                }
            }
        }

        self.recent.push(text.clone());
        Reply { text, source }
    }
}
