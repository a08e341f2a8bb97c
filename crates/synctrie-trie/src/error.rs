//! Error types for the trie engine.

use thiserror::Error;

use synctrie_store::StoreError;

/// Errors that can occur during trie operations.
#[derive(Debug, Error)]
pub enum TrieError {
    /// The backing store failed; nothing was applied.
    #[error("storage failure: {0}")]
    Storage(StoreError),

    /// A persisted record could not be decoded or has the wrong shape.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// A parent lists a child whose record is absent.
    #[error("missing node record at {0}")]
    MissingNode(String),

    /// A mutation reached a child that was not loaded first.
    #[error("node at {0} was not materialized")]
    NotMaterialized(String),

    /// Persisted records disagree with each other.
    #[error("integrity violation at {path}: {reason}")]
    Integrity { path: String, reason: String },
}

impl TrieError {
    /// Whether this error came from the backing store.
    pub fn is_storage(&self) -> bool {
        matches!(self, TrieError::Storage(_))
    }
}

impl From<StoreError> for TrieError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::MalformedRecord { key, reason } => {
                TrieError::MalformedRecord(format!("{}: {}", key, reason))
            }
            other => TrieError::Storage(other),
        }
    }
}

/// Result type for trie operations.
pub type Result<T> = std::result::Result<T, TrieError>;
