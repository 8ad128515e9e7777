//! Error types for Tilt.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TiltError {
    #[error("Dataset not found: {0}")]
    DatasetMissing(String),

    #[error("Dataset read failed: {0}")]
    DatasetRead(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Augmentation produced an empty core")]
    EmptyCore,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TiltError {
    pub fn code(&self) -> i32 {
        match self {
            TiltError::DatasetMissing(_) => -32010,
            TiltError::DatasetRead(_) => -32011,
            TiltError::Io(_) => -32006,
            TiltError::Json(_) => -32700,
            TiltError::Config(_) => -32012,
            TiltError::EmptyCore => -32020,
            TiltError::Internal(_) => -32603,
        }
    }
}

pub type Result<T> = std::result::Result<T, TiltError>;
