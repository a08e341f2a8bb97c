//! Trie node persistence on top of a [`KvStore`].
//!
//! Each node is stored under `[namespace] ++ path`, where `path` is the byte
//! sequence from the root to the node. The root lives at `[namespace]`.
//! Values are [`NodeRecord`] CBOR encodings.

use bytes::Bytes;
use synctrie_core::{NodeRecord, SyncId, SYNC_ID_LENGTH};

use crate::error::{Result, StoreError};
use crate::traits::{KvStore, Transaction};

/// Default namespace byte for trie records.
pub const DEFAULT_NAMESPACE: u8 = 8;

/// Reads and stages trie node records in one namespace of a store.
#[derive(Debug, Clone)]
pub struct TrieNodeStore<S> {
    store: S,
    namespace: u8,
}

impl<S: KvStore> TrieNodeStore<S> {
    /// Wrap `store`, keeping records under `namespace`.
    pub fn new(store: S, namespace: u8) -> Self {
        Self { store, namespace }
    }

    /// The namespace byte.
    pub fn namespace(&self) -> u8 {
        self.namespace
    }

    /// The underlying store.
    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Storage key of the node at `path`.
    pub fn node_key(&self, path: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(1 + path.len());
        key.push(self.namespace);
        key.extend_from_slice(path);
        key
    }

    /// Load and validate the node at `path`.
    pub async fn load(&self, path: &[u8]) -> Result<Option<NodeRecord>> {
        let key = self.node_key(path);
        match self.store.get(&key).await? {
            Some(bytes) => decode(&key, path.len(), &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Stage a write of `record` at `path`.
    pub fn stage_put(&self, tx: &mut Transaction, path: &[u8], record: &NodeRecord) -> Result<()> {
        let bytes = record
            .to_bytes()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        tx.put(self.node_key(path), Bytes::from(bytes));
        Ok(())
    }

    /// Stage removal of the node at `path`.
    pub fn stage_delete(&self, tx: &mut Transaction, path: &[u8]) {
        tx.delete(self.node_key(path));
    }

    /// Apply staged writes atomically.
    pub async fn commit(&self, tx: Transaction) -> Result<()> {
        let ops = tx.len();
        self.store.commit(tx).await?;
        tracing::trace!(namespace = self.namespace, ops, "committed trie batch");
        Ok(())
    }

    /// Every record at or below `path`, ascending by path.
    ///
    /// The returned paths exclude the namespace byte.
    pub async fn scan(&self, path: &[u8]) -> Result<Vec<(Vec<u8>, NodeRecord)>> {
        let entries = self.store.scan_prefix(&self.node_key(path)).await?;
        let mut out = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let node_path = key[1..].to_vec();
            let record = decode(&key, node_path.len(), &value)?;
            out.push((node_path, record));
        }
        Ok(out)
    }

    /// Identifiers of every persisted leaf at or below `path`, ascending.
    pub async fn leaf_ids(&self, path: &[u8]) -> Result<Vec<SyncId>> {
        let entries = self.store.scan_prefix(&self.node_key(path)).await?;
        let mut ids = Vec::new();
        for (key, value) in entries {
            let depth = key.len() - 1;
            if depth != SYNC_ID_LENGTH {
                continue;
            }
            let record = decode(&key, depth, &value)?;
            if let Some(id) = record.key {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Number of records stored in this namespace.
    pub async fn count(&self) -> Result<usize> {
        Ok(self.store.scan_prefix(&[self.namespace]).await?.len())
    }
}

fn decode(key: &[u8], depth: usize, bytes: &[u8]) -> Result<NodeRecord> {
    let record = NodeRecord::from_bytes(bytes).map_err(|e| StoreError::malformed(key, e))?;
    record
        .check_shape(depth)
        .map_err(|e| StoreError::malformed(key, e))?;
    Ok(record)
}
