//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use synctrie_core::{SyncId, HASH_LENGTH};
use synctrie_store::{KvStore, MemoryStore, Result, StoreError, Transaction};
use synctrie_trie::{MerkleTrie, TrieConfig};

/// Timestamps from the classic three-item scenario.
pub const SAMPLE_TIMESTAMPS: [u64; 3] = [1665182332, 1665182343, 1665182345];

/// Deterministic identifier: `timestamp` followed by a hash of `n`.
pub fn sync_id_at(timestamp: u64, n: u32) -> SyncId {
    let mut input = timestamp.to_be_bytes().to_vec();
    input.extend_from_slice(&n.to_be_bytes());
    let digest = blake3::hash(&input);

    let mut hash = [0u8; HASH_LENGTH];
    hash.copy_from_slice(&digest.as_bytes()[..HASH_LENGTH]);
    match SyncId::new(timestamp, &hash) {
        Ok(id) => id,
        Err(err) => panic!("fixture timestamp {timestamp} rejected: {err}"),
    }
}

/// `count` deterministic identifiers one second apart from `start`.
pub fn sequential_ids(start: u64, count: u32) -> Vec<SyncId> {
    (0..count).map(|n| sync_id_at(start + u64::from(n), n)).collect()
}

/// Identifier at `timestamp` with a random hash part.
pub fn random_sync_id(timestamp: u64) -> SyncId {
    let hash: [u8; HASH_LENGTH] = rand::random();
    match SyncId::new(timestamp, &hash) {
        Ok(id) => id,
        Err(err) => panic!("fixture timestamp {timestamp} rejected: {err}"),
    }
}

/// An in-memory trie over a shared store.
pub type MemoryTrie = MerkleTrie<Arc<MemoryStore>>;

/// Empty trie plus a handle on its store.
pub fn memory_trie(config: TrieConfig) -> (MemoryTrie, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (MerkleTrie::new(Arc::clone(&store), config), store)
}

/// Trie holding one identifier per timestamp.
pub async fn trie_with_timestamps(timestamps: &[u64]) -> (MemoryTrie, Vec<SyncId>) {
    let ids: Vec<SyncId> = timestamps
        .iter()
        .enumerate()
        .map(|(n, ts)| sync_id_at(*ts, n as u32))
        .collect();
    let trie = populated_trie(&ids, TrieConfig::default()).await;
    (trie, ids)
}

/// Trie holding `ids`.
pub async fn populated_trie(ids: &[SyncId], config: TrieConfig) -> MemoryTrie {
    let (trie, _) = memory_trie(config);
    for id in ids {
        if let Err(err) = trie.insert(id).await {
            panic!("fixture insert of {id:?} failed: {err}");
        }
    }
    trie
}

/// A store wrapper whose commits can be made to fail on demand.
pub struct FlakyStore<S> {
    inner: S,
    failing: AtomicBool,
    commits: AtomicUsize,
}

impl<S: KvStore> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
            commits: AtomicUsize::new(0),
        }
    }

    /// Make every following commit fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Successful commits so far.
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: KvStore> KvStore for FlakyStore<S> {
    async fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        self.inner.get(key).await
    }

    async fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Bytes)>> {
        self.inner.scan_prefix(prefix).await
    }

    async fn commit(&self, tx: Transaction) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Commit(format!(
                "injected failure ({} ops dropped)",
                tx.len()
            )));
        }
        self.inner.commit(tx).await?;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_id_at_is_deterministic() {
        assert_eq!(sync_id_at(1665182332, 1), sync_id_at(1665182332, 1));
        assert_ne!(sync_id_at(1665182332, 1), sync_id_at(1665182332, 2));
        assert_eq!(sync_id_at(1665182332, 1).timestamp(), Some(1665182332));
    }

    #[tokio::test]
    async fn test_flaky_store_rejects_when_failing() {
        let store = FlakyStore::new(MemoryStore::new());
        let mut tx = Transaction::new();
        tx.put(b"k".to_vec(), Bytes::from_static(b"v"));

        store.set_failing(true);
        assert!(matches!(store.commit(tx.clone()).await, Err(StoreError::Commit(_))));
        assert!(store.inner().is_empty());

        store.set_failing(false);
        store.commit(tx).await.unwrap();
        assert_eq!(store.commits(), 1);
        assert_eq!(store.get(b"k").await.unwrap(), Some(Bytes::from_static(b"v")));
    }
}
