//! Prompt catalog: in-memory index of prompts and their reply banks.
//!
//! Built once from two datasets:
//! - `inputs.json`: flat list of example inputs (optional, display/seed only)
//! - `prompts.json`: list of `{prompt, responses}` records (required)
//!
//! Loading tries an async read first and a blocking read second, so the
//! catalog can be loaded from inside or outside a tokio runtime.

use crate::error::{Result, TiltError};
use crate::jsonc::parse_jsonc;
use crate::lexical::tokenize;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One prompt with its bank of candidate replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptEntry {
    pub prompt: String,
    #[serde(default)]
    pub responses: Vec<String>,
}

impl PromptEntry {
    pub fn new(prompt: impl Into<String>, responses: Vec<String>) -> Self {
        Self {
            prompt: prompt.into(),
            responses,
        }
    }
}

/// Where the two datasets live on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetPaths {
    pub prompts: PathBuf,
    pub inputs: PathBuf,
}

impl DatasetPaths {
    /// Standard file names inside a data directory.
    pub fn in_dir(dir: impl AsRef<Path>, prompts_file: &str, inputs_file: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            prompts: dir.join(prompts_file),
            inputs: dir.join(inputs_file),
        }
    }
}

/// Terminal state of a catalog load, as seen by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogStatus {
    /// `load` has not completed yet
    Pending,
    /// Loaded (possibly with zero prompts)
    Ready { prompts: usize, responses: usize },
    /// Load failed; engine answers with the not-ready sentinel
    Unavailable { reason: String },
}

impl CatalogStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, CatalogStatus::Ready { .. })
    }
}

/// Immutable prompt index.
#[derive(Debug, Clone, Default)]
pub struct PromptCatalog {
    /// Prompts in catalog order (first occurrence position)
    order: Vec<String>,
    /// Prompt -> responses (last loaded wins)
    responses: HashMap<String, Vec<String>>,
    /// Prompt -> token set, precomputed for scoring
    tokens: HashMap<String, BTreeSet<String>>,
    /// Every response across every prompt, in catalog order
    pool: Vec<String>,
    /// Example inputs from the optional inputs dataset
    sample_inputs: Vec<String>,
}

impl PromptCatalog {
    /// Build an index from entries. Duplicate prompts keep their first
    /// position but take the responses of the last occurrence.
    pub fn from_entries(entries: Vec<PromptEntry>) -> Self {
        let mut catalog = Self::default();

        for entry in entries {
            if !catalog.responses.contains_key(&entry.prompt) {
                catalog.order.push(entry.prompt.clone());
                catalog.tokens.insert(
                    entry.prompt.clone(),
                    tokenize(&entry.prompt).into_iter().collect(),
                );
            }
            catalog.responses.insert(entry.prompt, entry.responses);
        }

        catalog.pool = catalog
            .order
            .iter()
            .filter_map(|p| catalog.responses.get(p))
            .flatten()
            .cloned()
            .collect();

        catalog
    }

    /// Attach the example-input dataset.
    pub fn with_sample_inputs(mut self, inputs: Vec<String>) -> Self {
        self.sample_inputs = inputs;
        self
    }

    /// Load both datasets. Prompts are required; inputs are optional.
    pub async fn load(paths: &DatasetPaths) -> Result<Self> {
        let prompts_text = read_resource(&paths.prompts).await?;
        let inputs_text = read_resource(&paths.inputs).await;
        Self::from_texts(&prompts_text, inputs_text, paths)
    }

    /// Load using only the blocking path.
    pub fn load_blocking(paths: &DatasetPaths) -> Result<Self> {
        let prompts_text = read_blocking(&paths.prompts)?;
        let inputs_text = read_blocking(&paths.inputs);
        Self::from_texts(&prompts_text, inputs_text, paths)
    }

    fn from_texts(
        prompts_text: &str,
        inputs_text: Result<String>,
        paths: &DatasetPaths,
    ) -> Result<Self> {
        let entries: Vec<PromptEntry> = parse_jsonc(prompts_text)?;

        let inputs = match inputs_text.and_then(|t| parse_jsonc::<Vec<String>>(&t)) {
            Ok(inputs) => inputs,
            Err(e) => {
                warn!("Sample inputs unavailable ({}): {}", paths.inputs.display(), e);
                Vec::new()
            }
        };

        let catalog = Self::from_entries(entries).with_sample_inputs(inputs);
        info!(
            "Catalog loaded: {} prompts, {} responses, {} sample inputs",
            catalog.len(),
            catalog.pool.len(),
            catalog.sample_inputs.len()
        );
        Ok(catalog)
    }

    /// Prompts in catalog order
    pub fn prompts(&self) -> &[String] {
        &self.order
    }

    /// Responses for one prompt
    pub fn responses(&self, prompt: &str) -> Option<&[String]> {
        self.responses.get(prompt).map(Vec::as_slice)
    }

    /// Pre-tokenized prompt
    pub fn prompt_tokens(&self, prompt: &str) -> Option<&BTreeSet<String>> {
        self.tokens.get(prompt)
    }

    /// Catalog-wide response pool
    pub fn pool(&self) -> &[String] {
        &self.pool
    }

    pub fn sample_inputs(&self) -> &[String] {
        &self.sample_inputs
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn status(&self) -> CatalogStatus {
        CatalogStatus::Ready {
            prompts: self.len(),
            responses: self.pool.len(),
        }
    }
}

/// Read a dataset, async first. Falls back to a blocking read when the
/// async path errors or no runtime is available.
async fn read_resource(path: &Path) -> Result<String> {
    if tokio::runtime::Handle::try_current().is_ok() {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => return Ok(text),
            Err(e) => debug!(
                "Async read of {} failed ({}), trying blocking read",
                path.display(),
                e
            ),
        }
    }
    read_blocking(path)
}

fn read_blocking(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TiltError::DatasetMissing(path.display().to_string()),
        _ => TiltError::DatasetRead(format!("{}: {}", path.display(), e)),
    })
}
