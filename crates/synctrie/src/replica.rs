//! A replica: one trie plus the settings it syncs with.

use std::path::Path;
use std::sync::Arc;

use synctrie_core::SyncId;
use synctrie_store::{KvStore, MemoryStore, SqliteStore};
use synctrie_sync::{memory, MemoryTransport, SyncConfig, SyncPeer, SyncReport, SyncSession};
use synctrie_trie::{MerkleTrie, TrieConfig};
use tokio::task::JoinHandle;

use crate::error::Result;

/// Configuration for a [`Replica`].
#[derive(Debug, Clone, Default)]
pub struct ReplicaConfig {
    /// Engine configuration.
    pub trie: TrieConfig,
    /// Reconciliation configuration.
    pub sync: SyncConfig,
}

/// A sync trie and the configuration for reconciling it with peers.
pub struct Replica<S: KvStore> {
    trie: Arc<MerkleTrie<S>>,
    config: ReplicaConfig,
}

/// Open a replica backed by a fresh in-memory store.
pub async fn open_memory(config: ReplicaConfig) -> Result<Replica<MemoryStore>> {
    Replica::open(MemoryStore::new(), config).await
}

/// Open a replica backed by the SQLite database at `path`, creating it if needed.
pub async fn open_sqlite(path: impl AsRef<Path>, config: ReplicaConfig) -> Result<Replica<SqliteStore>> {
    let store = SqliteStore::open(path)?;
    Replica::open(store, config).await
}

impl<S: KvStore> Replica<S> {
    /// Load the trie persisted in `store`.
    pub async fn open(store: S, config: ReplicaConfig) -> Result<Self> {
        let trie = MerkleTrie::open(store, config.trie.clone()).await?;
        Ok(Self {
            trie: Arc::new(trie),
            config,
        })
    }

    /// The engine.
    pub fn trie(&self) -> &Arc<MerkleTrie<S>> {
        &self.trie
    }

    /// Get the configuration.
    pub fn config(&self) -> &ReplicaConfig {
        &self.config
    }

    /// Add identifiers, returning how many were new.
    pub async fn insert_all<'a, I>(&self, ids: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a SyncId>,
    {
        let mut inserted = 0;
        for id in ids {
            if self.trie.insert(id).await? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sync Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Report what `peer` holds under `prefix` that this replica lacks.
    pub async fn diff_with<P: SyncPeer>(&self, peer: P, prefix: &[u8]) -> Result<SyncReport> {
        Ok(self.session(peer).run(prefix).await?)
    }

    /// Copy everything `peer` holds under `prefix` that this replica lacks.
    pub async fn pull_from<P: SyncPeer>(&self, peer: P, prefix: &[u8]) -> Result<SyncReport> {
        Ok(self.session(peer).pull(prefix).await?)
    }

    /// Pull from `peer`, scoped to the timestamp `now` minus the configured lag.
    pub async fn pull_at<P: SyncPeer>(&self, peer: P, now: u64) -> Result<SyncReport> {
        Ok(self.session(peer).pull_at(now).await?)
    }

    fn session<P: SyncPeer>(&self, peer: P) -> SyncSession<S, P> {
        SyncSession::new(Arc::clone(&self.trie), peer, self.config.sync.clone())
    }
}

impl<S: KvStore + 'static> Replica<S> {
    /// Serve this replica over an in-memory transport.
    pub fn serve_memory(&self) -> (MemoryTransport, JoinHandle<()>) {
        memory::connect(Arc::clone(&self.trie))
    }
}
