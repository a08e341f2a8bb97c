//! Engine configuration.

use synctrie_store::DEFAULT_NAMESPACE;

/// Configuration for a [`MerkleTrie`](crate::MerkleTrie).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrieConfig {
    /// Key prefix byte for node records in the backing store.
    pub namespace: u8,
    /// Unload the root's children after this many successful mutations.
    /// `None` keeps every loaded node in memory.
    pub unload_threshold: Option<u64>,
}

impl TrieConfig {
    /// Use a different record namespace.
    pub fn with_namespace(mut self, namespace: u8) -> Self {
        self.namespace = namespace;
        self
    }

    /// Change or disable automatic unloading.
    pub fn with_unload_threshold(mut self, threshold: Option<u64>) -> Self {
        self.unload_threshold = threshold;
        self
    }
}

impl Default for TrieConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE,
            unload_threshold: Some(10_000),
        }
    }
}
