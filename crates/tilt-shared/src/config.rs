//! Configuration for Tilt.
//!
//! Loads settings from `$TILT_CONFIG` or `~/.config/tilt/config.toml`,
//! falling back to defaults when neither is readable.

use crate::augment::Style;
use crate::catalog::DatasetPaths;
use crate::error::{Result, TiltError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment override for the config file
pub const CONFIG_ENV: &str = "TILT_CONFIG";

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Directory holding the datasets
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Prompt/response dataset file name
    #[serde(default = "default_prompts_file")]
    pub prompts_file: String,

    /// Example-input dataset file name
    #[serde(default = "default_inputs_file")]
    pub inputs_file: String,

    /// Reply voice
    #[serde(default)]
    pub style: Style,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_prompts_file() -> String {
    "prompts.json".to_string()
}

fn default_inputs_file() -> String {
    "inputs.json".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            prompts_file: default_prompts_file(),
            inputs_file: default_inputs_file(),
            style: Style::default(),
        }
    }
}

impl EngineConfig {
    pub fn dataset_paths(&self) -> DatasetPaths {
        DatasetPaths::in_dir(&self.data_dir, &self.prompts_file, &self.inputs_file)
    }
}

/// Thinking-delay pacing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PacingConfig {
    /// Shortest delay in milliseconds
    #[serde(default = "default_min_ms")]
    pub min_ms: u64,

    /// Longest delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,

    /// Added per reply character
    #[serde(default = "default_per_char_ms")]
    pub per_char_ms: u64,

    /// Uniform jitter, percent either way
    #[serde(default = "default_jitter_pct")]
    pub jitter_pct: u8,
}

fn default_min_ms() -> u64 {
    600
}

fn default_max_ms() -> u64 {
    2_400
}

fn default_per_char_ms() -> u64 {
    18
}

fn default_jitter_pct() -> u8 {
    15
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_ms: default_min_ms(),
            max_ms: default_max_ms(),
            per_char_ms: default_per_char_ms(),
            jitter_pct: default_jitter_pct(),
        }
    }
}

/// Deferred task scheduler wake sources
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerConfig {
    /// Background tick period in milliseconds (0 disables)
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Fallback sweep period in milliseconds (0 disables)
    #[serde(default = "default_sweep_ms")]
    pub sweep_ms: u64,

    /// Added to the soonest deadline before waking
    #[serde(default = "default_margin_ms")]
    pub margin_ms: u64,

    /// Treat SIGCONT (resumed from background) as a wake event
    #[serde(default = "default_foreground_signal")]
    pub foreground_signal: bool,
}

fn default_tick_ms() -> u64 {
    250
}

fn default_sweep_ms() -> u64 {
    1_000
}

fn default_margin_ms() -> u64 {
    5
}

fn default_foreground_signal() -> bool {
    true
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            sweep_ms: default_sweep_ms(),
            margin_ms: default_margin_ms(),
            foreground_signal: default_foreground_signal(),
        }
    }
}

impl SchedulerConfig {
    pub fn margin(&self) -> Duration {
        Duration::from_millis(self.margin_ms)
    }
}

/// Full configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TiltConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub pacing: PacingConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl TiltConfig {
    /// Load from `$TILT_CONFIG`, then the user config dir, else defaults.
    pub fn load() -> Self {
        let candidates: Vec<PathBuf> = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .into_iter()
            .chain(default_config_path())
            .collect();

        for path in &candidates {
            match Self::load_from_path(path) {
                Ok(config) => return config,
                Err(e) => warn!("Config {} not usable: {}", path.display(), e),
            }
        }

        info!("Using default config");
        TiltConfig::default()
    }

    /// Load config from specific path
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: TiltConfig = toml::from_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save default config to path (for init)
    pub fn save_default(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(&TiltConfig::default())
            .map_err(|e| TiltError::Internal(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        info!("Saved default config to {}", path.display());
        Ok(())
    }
}

/// `~/.config/tilt/config.toml` (platform equivalent)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tilt").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TiltConfig::default();
        assert_eq!(config.engine.prompts_file, "prompts.json");
        assert_eq!(config.engine.style, Style::Coach);
        assert_eq!(config.pacing.min_ms, 600);
        assert_eq!(config.scheduler.sweep_ms, 1_000);
        assert!(config.scheduler.foreground_signal);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: TiltConfig = toml::from_str(
            r#"
            [engine]
            style = "blunt"

            [pacing]
            max_ms = 900
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.style, Style::Blunt);
        assert_eq!(config.engine.inputs_file, "inputs.json");
        assert_eq!(config.pacing.max_ms, 900);
        assert_eq!(config.pacing.min_ms, 600);
        assert_eq!(config.scheduler, SchedulerConfig::default());
    }

    #[test]
    fn test_save_then_load_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        TiltConfig::save_default(&path).unwrap();
        let loaded = TiltConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded, TiltConfig::default());
    }

    #[test]
    fn test_malformed_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[engine\nstyle = ").unwrap();
        assert!(TiltConfig::load_from_path(&path).is_err());
    }

    #[test]
    fn test_dataset_paths() {
        let config = EngineConfig {
            data_dir: PathBuf::from("/srv/tilt"),
            ..EngineConfig::default()
        };
        let paths = config.dataset_paths();
        assert_eq!(paths.prompts, PathBuf::from("/srv/tilt/prompts.json"));
        assert_eq!(paths.inputs, PathBuf::from("/srv/tilt/inputs.json"));
    }
}
