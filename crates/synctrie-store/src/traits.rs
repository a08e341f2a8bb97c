//! KvStore trait: the abstract interface the trie persists through.
//!
//! The trie only needs three things from a backend: point reads, ordered
//! prefix scans, and atomic multi-key commits. Implementations include
//! SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// A single staged write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Insert or overwrite `key`.
    Put { key: Vec<u8>, value: Bytes },
    /// Remove `key` if present.
    Delete { key: Vec<u8> },
}

impl WriteOp {
    /// The key this operation touches.
    pub fn key(&self) -> &[u8] {
        match self {
            WriteOp::Put { key, .. } | WriteOp::Delete { key } => key,
        }
    }
}

/// An ordered batch of writes applied all-or-nothing by [`KvStore::commit`].
///
/// Later operations on the same key win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    ops: Vec<WriteOp>,
}

impl Transaction {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an insert or overwrite.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Bytes>) {
        self.ops.push(WriteOp::Put {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Stage a removal.
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.ops.push(WriteOp::Delete { key: key.into() });
    }

    /// Number of staged operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Staged operations in order.
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Consume the batch.
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Async interface for ordered key-value persistence.
///
/// All methods are async to support both blocking (SQLite) and async
/// backends. For SQLite, `spawn_blocking` keeps the runtime free.
///
/// # Design Notes
///
/// - **Atomic commits**: either every operation of a [`Transaction`] is
///   visible afterwards or none is.
/// - **Ordered scans**: [`KvStore::scan_prefix`] returns entries in ascending
///   key order.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read one value.
    async fn get(&self, key: &[u8]) -> Result<Option<Bytes>>;

    /// Every entry whose key starts with `prefix`, ascending by key.
    async fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Bytes)>>;

    /// Apply a batch atomically.
    async fn commit(&self, tx: Transaction) -> Result<()>;

    /// Whether a key is present.
    async fn contains(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

#[async_trait]
impl<S: KvStore + ?Sized> KvStore for std::sync::Arc<S> {
    async fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        (**self).get(key).await
    }

    async fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Bytes)>> {
        (**self).scan_prefix(prefix).await
    }

    async fn commit(&self, tx: Transaction) -> Result<()> {
        (**self).commit(tx).await
    }
}

/// Smallest key greater than every key starting with `prefix`.
///
/// Returns `None` when no such bound exists (empty or all-0xff prefix).
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}
