//! Error types for the sync trie core.

use thiserror::Error;

/// Errors raised while building identifiers or decoding node records.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid {what} length: expected {expected}, got {got}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("timestamp {0} does not fit in the identifier prefix")]
    TimestampOutOfRange(u64),

    #[error("malformed node record: {0}")]
    MalformedRecord(String),

    #[error("encoding error: {0}")]
    EncodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
