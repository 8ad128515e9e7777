//! Shared engine for Tilt: canned-reply selection, deterministic
//! augmentation, and a throttle-tolerant deferred task scheduler.

pub mod augment;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod entities;
pub mod error;
pub mod jsonc;
pub mod lexical;
pub mod pacing;
pub mod recent;
pub mod scheduler;
pub mod seeded;
pub mod selector;

pub use augment::{Augmenter, Style, MAX_REPLY_CHARS};
pub use catalog::{CatalogStatus, DatasetPaths, PromptCatalog, PromptEntry};
pub use config::{EngineConfig, PacingConfig, SchedulerConfig, TiltConfig};
pub use engine::{Reply, ReplySource, ResponseEngine, NOT_READY_REPLY, NO_MATCH_REPLY};
pub use error::TiltError;
pub use recent::{RecentOutputBuffer, RECENT_CAPACITY};
pub use scheduler::{Scheduler, SchedulerHandle, TaskId, WakeSource};
pub use selector::{ReplySelector, Selection};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
