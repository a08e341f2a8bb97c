//! Reconciliation sessions.
//!
//! A session compares the local trie with one peer. Snapshots narrow the
//! comparison to the deepest prefix under which the replicas can differ;
//! a breadth-first walk of the peer's node metadata then descends only into
//! subtrees whose digests disagree, fetching concrete identifiers once a
//! subtree is small enough.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use synctrie_core::{timestamp_prefix, NodeMetadata, SyncId, SYNC_ID_LENGTH};
use synctrie_store::KvStore;
use synctrie_trie::MerkleTrie;

use crate::error::{Result, SyncError};
use crate::messages::limits;
use crate::peer::SyncPeer;

/// Configuration for sync behavior.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Seconds of recent history left out of timestamp-scoped sessions.
    pub snapshot_lag: u64,
    /// Largest subtree whose identifiers are fetched outright.
    pub ids_per_fetch: u64,
    /// Maximum peer nodes examined in one session.
    pub max_nodes_per_session: usize,
    /// Timeout for each peer request.
    pub message_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            snapshot_lag: 10,
            ids_per_fetch: 128,
            max_nodes_per_session: 4096,
            message_timeout: Duration::from_secs(30),
        }
    }
}

/// Result of a sync session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Prefix the session was scoped to.
    pub prefix: Vec<u8>,
    /// Where the snapshots stopped agreeing.
    pub divergence_prefix: Vec<u8>,
    /// Identifiers the peer holds and the local trie lacks, ascending.
    pub missing: Vec<SyncId>,
    /// Identifiers added locally; only [`SyncSession::pull`] inserts.
    pub inserted: usize,
    /// Peer nodes examined.
    pub nodes_visited: usize,
    /// Whether both replicas hold exactly the same identifiers.
    pub in_sync: bool,
    /// The node budget ran out before the walk finished.
    pub truncated: bool,
}

/// Sync session between a local trie and one peer.
pub struct SyncSession<S: KvStore, P: SyncPeer> {
    /// The local trie.
    local: Arc<MerkleTrie<S>>,
    /// The remote side.
    peer: P,
    /// Configuration.
    config: SyncConfig,
}

impl<S: KvStore, P: SyncPeer> SyncSession<S, P> {
    /// Create a new sync session.
    pub fn new(local: Arc<MerkleTrie<S>>, peer: P, config: SyncConfig) -> Self {
        Self {
            local,
            peer,
            config,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Find the identifiers under reach of `prefix` that the peer has and
    /// the local trie lacks. Nothing is written locally.
    pub async fn run(&self, prefix: &[u8]) -> Result<SyncReport> {
        let theirs = self.ask("snapshot", self.peer.snapshot(prefix)).await?;
        let divergence = self
            .local
            .get_divergence_prefix(prefix, &theirs.excluded_hashes)
            .await?;

        tracing::debug!(
            prefix = %String::from_utf8_lossy(prefix),
            divergence = %String::from_utf8_lossy(&divergence),
            "compared snapshots"
        );

        let mut report = SyncReport {
            prefix: prefix.to_vec(),
            divergence_prefix: divergence.clone(),
            ..SyncReport::default()
        };
        let differs = self.walk(divergence, &mut report).await?;

        report.missing.sort();
        report.missing.dedup();
        report.in_sync = !differs && !report.truncated;

        tracing::info!(
            missing = report.missing.len(),
            nodes_visited = report.nodes_visited,
            in_sync = report.in_sync,
            truncated = report.truncated,
            "sync session complete"
        );
        Ok(report)
    }

    /// Run a session scoped to the timestamp `now - snapshot_lag`.
    pub async fn run_at(&self, now: u64) -> Result<SyncReport> {
        let prefix = timestamp_prefix(now.saturating_sub(self.config.snapshot_lag))?;
        self.run(&prefix).await
    }

    /// Run a session and insert every missing identifier locally.
    pub async fn pull(&self, prefix: &[u8]) -> Result<SyncReport> {
        let report = self.run(prefix).await?;
        self.insert_missing(report).await
    }

    /// [`SyncSession::pull`] scoped like [`SyncSession::run_at`].
    pub async fn pull_at(&self, now: u64) -> Result<SyncReport> {
        let report = self.run_at(now).await?;
        self.insert_missing(report).await
    }

    async fn insert_missing(&self, mut report: SyncReport) -> Result<SyncReport> {
        for id in &report.missing {
            if self.local.insert(id).await? {
                report.inserted += 1;
            }
        }
        tracing::debug!(inserted = report.inserted, "pulled identifiers from peer");
        Ok(report)
    }

    /// Breadth-first walk of the peer's subtree at `start`.
    ///
    /// Returns whether any visited node differs from the local one.
    async fn walk(&self, start: Vec<u8>, report: &mut SyncReport) -> Result<bool> {
        let fetch_limit = self
            .config
            .ids_per_fetch
            .min(limits::MAX_SYNC_IDS_PER_MESSAGE as u64);
        let mut differs = false;
        let mut queue = VecDeque::from([start]);

        while let Some(path) = queue.pop_front() {
            if report.nodes_visited >= self.config.max_nodes_per_session {
                report.truncated = true;
                break;
            }
            report.nodes_visited += 1;

            let ours = self.local.get_node_metadata(&path).await?;
            let Some(theirs) = self.ask("metadata", self.peer.node_metadata(&path)).await? else {
                differs |= ours.is_some();
                continue;
            };
            if ours.as_ref().map(|m| m.hash) == Some(theirs.hash) {
                continue;
            }
            differs = true;

            if theirs.item_count <= fetch_limit || path.len() == SYNC_ID_LENGTH {
                for id in self.ask("sync ids", self.peer.sync_ids(&path)).await? {
                    if !self.local.exists(&id).await? {
                        report.missing.push(id);
                    }
                }
                continue;
            }

            queue.extend(differing_children(&path, ours.as_ref(), &theirs));
        }

        Ok(differs)
    }

    async fn ask<T>(&self, what: &str, request: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.config.message_timeout, request)
            .await
            .map_err(|_| SyncError::Timeout(format!("waiting for peer {what}")))?
    }
}

/// Paths of the peer's children that are absent or different locally.
fn differing_children(
    path: &[u8],
    ours: Option<&NodeMetadata>,
    theirs: &NodeMetadata,
) -> Vec<Vec<u8>> {
    theirs
        .children
        .iter()
        .filter(|(byte, child)| {
            ours.and_then(|m| m.children.get(byte))
                .map_or(true, |local| local.hash != child.hash)
        })
        .map(|(byte, _)| {
            let mut child_path = path.to_vec();
            child_path.push(*byte);
            child_path
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use synctrie_core::TrieSnapshot;
    use synctrie_store::MemoryStore;
    use synctrie_trie::TrieConfig;

    type Trie = Arc<MerkleTrie<MemoryStore>>;

    fn sync_id(ts: u64, n: u32) -> SyncId {
        let hash = blake3::hash(&n.to_be_bytes());
        SyncId::new(ts, &hash.as_bytes()[..20]).unwrap()
    }

    async fn trie_with(ids: &[SyncId]) -> Trie {
        let trie = Arc::new(MerkleTrie::new(MemoryStore::new(), TrieConfig::default()));
        for id in ids {
            trie.insert(id).await.unwrap();
        }
        trie
    }

    fn shared_ids() -> Vec<SyncId> {
        (0..40).map(|n| sync_id(1665182300 + n as u64, n)).collect()
    }

    #[tokio::test]
    async fn test_identical_replicas_are_in_sync() {
        let local = trie_with(&shared_ids()).await;
        let peer = trie_with(&shared_ids()).await;

        let session = SyncSession::new(local, peer, SyncConfig::default());
        let report = session.run(b"1665182339").await.unwrap();

        assert!(report.in_sync);
        assert!(report.missing.is_empty());
        assert_eq!(report.divergence_prefix, b"1665182339");
    }

    #[tokio::test]
    async fn test_reports_exactly_what_local_lacks() {
        let extra: Vec<SyncId> = (100..103).map(|n| sync_id(1665182400 + n as u64, n)).collect();
        let local = trie_with(&shared_ids()).await;
        let peer = trie_with(&[shared_ids(), extra.clone()].concat()).await;

        let session = SyncSession::new(local, peer, SyncConfig::default());
        let report = session.run(b"").await.unwrap();

        let mut expected = extra;
        expected.sort();
        assert_eq!(report.missing, expected);
        assert!(!report.in_sync);
        assert!(!report.truncated);
    }

    #[tokio::test]
    async fn test_descends_past_fetch_limit() {
        let extra = sync_id(1665182355, 999);
        let local = trie_with(&shared_ids()).await;
        let peer = trie_with(&[shared_ids(), vec![extra]].concat()).await;

        let config = SyncConfig {
            ids_per_fetch: 2,
            ..SyncConfig::default()
        };
        let session = SyncSession::new(local, peer, config);
        let report = session.run(b"").await.unwrap();

        assert_eq!(report.missing, vec![extra]);
        assert!(report.nodes_visited > 1);
    }

    #[tokio::test]
    async fn test_local_superset_reports_nothing_missing() {
        let local = trie_with(&[shared_ids(), vec![sync_id(1665182399, 7)]].concat()).await;
        let peer = trie_with(&shared_ids()).await;

        let session = SyncSession::new(local, peer, SyncConfig::default());
        let report = session.run(b"").await.unwrap();

        assert!(report.missing.is_empty());
        assert!(!report.in_sync);
    }

    #[tokio::test]
    async fn test_pull_converges() {
        let local = trie_with(&shared_ids()[..10]).await;
        let peer = trie_with(&shared_ids()).await;

        let session = SyncSession::new(Arc::clone(&local), Arc::clone(&peer), SyncConfig::default());
        let report = session.pull(b"").await.unwrap();

        assert_eq!(report.inserted, 30);
        assert_eq!(local.root_hash().await, peer.root_hash().await);
        assert!(session.run(b"").await.unwrap().in_sync);
    }

    #[tokio::test]
    async fn test_empty_local_pulls_under_timestamp_prefix() {
        let local = trie_with(&[]).await;
        let peer = trie_with(&shared_ids()).await;

        let session = SyncSession::new(Arc::clone(&local), peer, SyncConfig::default());
        let report = session.pull(b"1665182343").await.unwrap();

        assert_eq!(report.divergence_prefix, b"1");
        assert_eq!(report.inserted, 40);
    }

    #[tokio::test]
    async fn test_run_at_applies_snapshot_lag() {
        let local = trie_with(&shared_ids()).await;
        let peer = trie_with(&shared_ids()).await;

        let config = SyncConfig {
            snapshot_lag: 30,
            ..SyncConfig::default()
        };
        let session = SyncSession::new(local, peer, config);
        let report = session.run_at(1665182343).await.unwrap();

        assert_eq!(report.prefix, b"1665182313");
        assert!(report.in_sync);
    }

    #[tokio::test]
    async fn test_node_budget_truncates() {
        let local = trie_with(&[]).await;
        let peer = trie_with(&shared_ids()).await;

        let config = SyncConfig {
            ids_per_fetch: 1,
            max_nodes_per_session: 3,
            ..SyncConfig::default()
        };
        let session = SyncSession::new(local, peer, config);
        let report = session.run(b"").await.unwrap();

        assert!(report.truncated);
        assert!(!report.in_sync);
        assert_eq!(report.nodes_visited, 3);
    }

    struct SilentPeer;

    #[async_trait]
    impl SyncPeer for SilentPeer {
        async fn snapshot(&self, _prefix: &[u8]) -> Result<TrieSnapshot> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(TrieSnapshot::default())
        }

        async fn node_metadata(&self, _prefix: &[u8]) -> Result<Option<NodeMetadata>> {
            Ok(None)
        }

        async fn sync_ids(&self, _prefix: &[u8]) -> Result<Vec<SyncId>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_peer_timeout() {
        let config = SyncConfig {
            message_timeout: Duration::from_millis(20),
            ..SyncConfig::default()
        };
        let session = SyncSession::new(trie_with(&[]).await, SilentPeer, config);

        let err = session.run(b"1").await.unwrap_err();
        assert!(matches!(err, SyncError::Timeout(_)));
    }
}
