//! Error types for the store module.

use thiserror::Error;

use synctrie_core::CoreError;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored node record failed to decode or has the wrong shape.
    #[error("malformed record at {key}: {reason}")]
    MalformedRecord { key: String, reason: String },

    /// Record encoding error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backend refused or failed to apply a write batch.
    #[error("commit failed: {0}")]
    Commit(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Wrap a record decoding failure for `key`.
    pub fn malformed(key: &[u8], err: CoreError) -> Self {
        let reason = match err {
            CoreError::MalformedRecord(reason) => reason,
            other => other.to_string(),
        };
        Self::MalformedRecord {
            key: hex::encode(key),
            reason,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
