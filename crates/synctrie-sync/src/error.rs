//! Error types for the sync module.

use thiserror::Error;

use crate::messages::SyncErrorCode;

/// Errors that can occur during sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Message validation failed.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Message could not be encoded or decoded.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Transport-level error.
    #[error("transport error: {0}")]
    TransportError(String),

    /// Invalid identifier or timestamp.
    #[error("core error: {0}")]
    Core(#[from] synctrie_core::CoreError),

    /// Local trie operation failed.
    #[error("trie error: {0}")]
    Trie(#[from] synctrie_trie::TrieError),

    /// Peer answered with an error.
    #[error("peer error ({code:?}): {message}")]
    PeerError { code: SyncErrorCode, message: String },

    /// Peer answered a different request than the one sent.
    #[error("unexpected response: expected {0}")]
    UnexpectedResponse(&'static str),

    /// Timeout waiting for peer.
    #[error("timeout: {0}")]
    Timeout(String),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
