//! Error Types
//!
//! Typed failures at the library boundary. Collaborator adapters use
//! `anyhow` internally and are folded into these variants by the store.

use std::path::PathBuf;
use thiserror::Error;

/// Skill store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// The similarity index and the registry disagree on entry count.
    #[error(
        "similarity index is not synced with the skill registry: \
         {index} entries in the index but {registry} skills in the registry. \
         Rebuild the index from the registry or remove the index directory to start from scratch"
    )]
    Consistency { index: usize, registry: usize },

    #[error("similarity index returned unknown skill: {0}")]
    UnknownSkill(String),

    #[error("Invalid skill name: {0}")]
    InvalidName(String),

    #[error("skill registry not found at {0} (resume requested)")]
    MissingRegistry(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Similarity index error: {0}")]
    Index(String),

    #[error("Completion error: {0}")]
    Completion(String),
}

impl StoreError {
    /// Fatal errors must stop the agent run; nothing here is retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::Consistency { .. }
                | StoreError::UnknownSkill(_)
                | StoreError::MissingRegistry(_)
        )
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Missing required variable: {0}")]
    Missing(&'static str),

    #[error("Failed to read {key} at {path}: {source}")]
    Unreadable {
        key: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failures normalizing or parsing near-JSON model output
#[derive(Error, Debug)]
pub enum RepairError {
    #[error("no JSON object found in response")]
    NoObject,

    #[error("JSON parse failed after repair: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A completion that could not be turned into a judgment
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error(transparent)]
    Repair(#[from] RepairError),

    #[error("response does not match schema: {0}")]
    Schema(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
