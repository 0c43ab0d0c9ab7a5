//! Error types for orderscout
//!
//! Centralized error handling using thiserror. Per-item failures (agent errors,
//! malformed results) are not errors at this level: they become outcomes.
//! Only the variants here can abort a pass.

use thiserror::Error;

/// All error types that can occur in orderscout
#[derive(Debug, Error)]
pub enum ScoutError {
    /// The record store could not be reached while fetching work
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A single outcome could not be written
    #[error("Store write failed for item {id}: {message}")]
    StoreWrite { id: String, message: String },

    /// Work item not found in the store
    #[error("Work item not found: {0}")]
    ItemNotFound(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Automation agent setup error (not a per-item failure)
    #[error("Agent error: {0}")]
    Agent(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl ScoutError {
    /// Build a store write error for the given item.
    pub fn store_write(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreWrite {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Whether this error must abort the whole pass.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScoutError::StoreUnavailable(_) | ScoutError::Config(_))
    }
}

/// Result type alias for orderscout operations
pub type Result<T> = std::result::Result<T, ScoutError>;
