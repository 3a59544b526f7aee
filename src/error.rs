//! Error types for the review scheduler and its collaborators.

use crate::models::{RecordId, Subject};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a catalog or record store.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(i64),

    #[error("Invalid stored value: {0}")]
    InvalidValue(String),

    /// A record already exists for this (learner, subject) pair
    #[error("learner '{learner_id}' already practices {subject}")]
    Duplicate { learner_id: String, subject: Subject },

    /// The record changed since it was loaded
    #[error("record {id} was modified concurrently (expected version {expected_version})")]
    StaleWrite { id: RecordId, expected_version: u64 },

    #[error("storage lock poisoned")]
    Poisoned,
}

/// Errors returned by [`crate::scheduler::Scheduler`] operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SchedulerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SchedulerError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, SchedulerError::Conflict(_))
    }
}

/// Errors loading or saving the application configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a configuration directory")]
    NoConfigDir,

    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
