//! The view of a replica that reconciliation needs.

use std::sync::Arc;

use async_trait::async_trait;
use synctrie_core::{NodeMetadata, SyncId, TrieSnapshot};
use synctrie_store::KvStore;
use synctrie_trie::MerkleTrie;

use crate::error::Result;

/// Read-only queries a reconciliation session issues against a replica.
///
/// Implemented directly by [`MerkleTrie`] for local replicas and by
/// [`RemotePeer`](crate::transport::RemotePeer) for replicas behind a
/// [`Transport`](crate::transport::Transport).
#[async_trait]
pub trait SyncPeer: Send + Sync {
    /// Excluded hashes along `prefix`.
    async fn snapshot(&self, prefix: &[u8]) -> Result<TrieSnapshot>;

    /// The node at `prefix`, if any.
    async fn node_metadata(&self, prefix: &[u8]) -> Result<Option<NodeMetadata>>;

    /// Every identifier under `prefix`, ascending.
    async fn sync_ids(&self, prefix: &[u8]) -> Result<Vec<SyncId>>;
}

#[async_trait]
impl<S: KvStore> SyncPeer for MerkleTrie<S> {
    async fn snapshot(&self, prefix: &[u8]) -> Result<TrieSnapshot> {
        Ok(self.get_snapshot(prefix).await?)
    }

    async fn node_metadata(&self, prefix: &[u8]) -> Result<Option<NodeMetadata>> {
        Ok(self.get_node_metadata(prefix).await?)
    }

    async fn sync_ids(&self, prefix: &[u8]) -> Result<Vec<SyncId>> {
        Ok(self.get_all_values(prefix).await?)
    }
}

#[async_trait]
impl<P: SyncPeer + ?Sized> SyncPeer for Arc<P> {
    async fn snapshot(&self, prefix: &[u8]) -> Result<TrieSnapshot> {
        (**self).snapshot(prefix).await
    }

    async fn node_metadata(&self, prefix: &[u8]) -> Result<Option<NodeMetadata>> {
        (**self).node_metadata(prefix).await
    }

    async fn sync_ids(&self, prefix: &[u8]) -> Result<Vec<SyncId>> {
        (**self).sync_ids(prefix).await
    }
}
