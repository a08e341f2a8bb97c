//! Error types for the facade.

use synctrie_core::CoreError;
use synctrie_store::StoreError;
use synctrie_sync::SyncError;
use synctrie_trie::TrieError;
use thiserror::Error;

/// Errors from any layer of the sync trie.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid identifier, timestamp, or record.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Trie engine error.
    #[error("trie error: {0}")]
    Trie(#[from] TrieError),

    /// Sync error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),
}

impl Error {
    /// Whether the failure came from the backing store, at any layer.
    pub fn is_storage(&self) -> bool {
        match self {
            Error::Store(_) => true,
            Error::Trie(err) | Error::Sync(SyncError::Trie(err)) => err.is_storage(),
            _ => false,
        }
    }
}

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, Error>;
