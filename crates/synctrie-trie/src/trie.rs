//! The Merkle trie engine.
//!
//! [`MerkleTrie`] keeps an in-memory view rooted at the empty path and
//! persists every node it touches through a [`TrieNodeStore`]. Subtrees are
//! materialized on demand and can be dropped back to summaries at any time
//! without changing any digest.

use std::borrow::Cow;

use synctrie_core::{ChildSummary, NodeMetadata, SyncId, TrieHash};
use synctrie_store::{KvStore, Transaction, TrieNodeStore};
use tokio::sync::RwLock;

use crate::config::TrieConfig;
use crate::error::{Result, TrieError};
use crate::node::{ChildRef, NodeWrite, TrieNode};

/// Mutable engine state guarded by the engine lock.
pub(crate) struct TrieState {
    pub(crate) root: TrieNode,
    /// Successful mutations since the last automatic unload.
    pub(crate) mutations: u64,
}

/// A persistent Merkle-radix trie over [`SyncId`]s.
///
/// Mutations are serialized by an internal reader-writer lock; reads run
/// concurrently with each other. Wrap in an `Arc` to share between tasks.
pub struct MerkleTrie<S: KvStore> {
    pub(crate) nodes: TrieNodeStore<S>,
    pub(crate) config: TrieConfig,
    pub(crate) state: RwLock<TrieState>,
}

impl<S: KvStore> MerkleTrie<S> {
    /// Create an engine with an empty in-memory view.
    ///
    /// Call [`MerkleTrie::initialize`] before mutating if `store` may already
    /// hold records in this namespace.
    pub fn new(store: S, config: TrieConfig) -> Self {
        Self {
            nodes: TrieNodeStore::new(store, config.namespace),
            config,
            state: RwLock::new(TrieState {
                root: TrieNode::empty(),
                mutations: 0,
            }),
        }
    }

    /// Create an engine and load its root from `store`.
    pub async fn open(store: S, config: TrieConfig) -> Result<Self> {
        let trie = Self::new(store, config);
        trie.initialize().await?;
        Ok(trie)
    }

    /// The engine configuration.
    pub fn config(&self) -> &TrieConfig {
        &self.config
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        self.nodes.inner()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Rebuild the in-memory view from the persisted root record.
    ///
    /// Children start unloaded. A missing root record means an empty trie.
    pub async fn initialize(&self) -> Result<()> {
        let mut state = self.state.write().await;
        let root = match self.nodes.load(&[]).await? {
            Some(record) => TrieNode::from_record(record),
            None => TrieNode::empty(),
        };

        tracing::info!(
            namespace = self.config.namespace,
            items = root.item_count,
            root = %root.hash,
            "initialized sync trie"
        );

        state.root = root;
        state.mutations = 0;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Add an identifier. Returns `false` if it was already present.
    pub async fn insert(&self, id: &SyncId) -> Result<bool> {
        let mut state = self.state.write().await;
        materialize_path(&mut state.root, id.as_bytes(), &self.nodes).await?;

        let checkpoint = state.root.unloaded_view();
        let mut writes = Vec::new();
        match state.root.insert(id, 0, &mut writes) {
            Ok(true) => {}
            Ok(false) => return Ok(false),
            Err(err) => {
                state.root = checkpoint;
                return Err(err);
            }
        }

        self.persist(&mut state, checkpoint, &writes).await?;
        tracing::trace!(id = ?id, writes = writes.len(), "inserted");
        Ok(true)
    }

    /// Remove an identifier. Returns `false` if it was absent.
    pub async fn delete(&self, id: &SyncId) -> Result<bool> {
        let mut state = self.state.write().await;
        materialize_path(&mut state.root, id.as_bytes(), &self.nodes).await?;

        let checkpoint = state.root.unloaded_view();
        let mut writes = Vec::new();
        match state.root.delete(id, 0, &mut writes) {
            Ok(true) => {}
            Ok(false) => return Ok(false),
            Err(err) => {
                state.root = checkpoint;
                return Err(err);
            }
        }

        self.persist(&mut state, checkpoint, &writes).await?;
        tracing::trace!(id = ?id, writes = writes.len(), "deleted");
        Ok(true)
    }

    /// Commit `writes`, or restore `checkpoint` if the store refuses them.
    async fn persist(
        &self,
        state: &mut TrieState,
        checkpoint: TrieNode,
        writes: &[NodeWrite],
    ) -> Result<()> {
        let outcome = match self.stage(writes) {
            Ok(tx) => self.nodes.commit(tx).await,
            Err(err) => Err(err),
        };

        if let Err(err) = outcome {
            tracing::error!(error = %err, "trie commit failed, rolling back");
            state.root = checkpoint;
            return Err(TrieError::from(err));
        }

        state.mutations += 1;
        if let Some(threshold) = self.config.unload_threshold {
            if state.mutations >= threshold {
                let unloaded = state.root.unload_children();
                state.mutations = 0;
                tracing::debug!(unloaded, "unloaded root children");
            }
        }
        Ok(())
    }

    fn stage(&self, writes: &[NodeWrite]) -> synctrie_store::Result<Transaction> {
        let mut tx = Transaction::new();
        for write in writes {
            match write {
                NodeWrite::Put(path, record) => self.nodes.stage_put(&mut tx, path, record)?,
                NodeWrite::Delete(path) => self.nodes.stage_delete(&mut tx, path),
            }
        }
        Ok(tx)
    }

    /// Downgrade the loaded children of the node at `prefix` to summaries.
    ///
    /// Only already-loaded nodes are visited; returns the number of children
    /// unloaded. Never touches storage or digests.
    pub async fn unload_children(&self, prefix: &[u8]) -> usize {
        let mut state = self.state.write().await;
        let mut node = &mut state.root;
        for byte in prefix {
            match node.children.get_mut(byte) {
                Some(ChildRef::Loaded(child)) => node = child.as_mut(),
                _ => return 0,
            }
        }
        node.unload_children()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether `id` is stored.
    pub async fn exists(&self, id: &SyncId) -> Result<bool> {
        let state = self.state.read().await;
        let node = self.resolve(&state.root, id.as_bytes()).await?;
        Ok(node.map_or(false, |n| n.key.as_ref() == Some(id)))
    }

    /// Digest of the whole trie; [`TrieHash::EMPTY`] when empty.
    pub async fn root_hash(&self) -> TrieHash {
        self.state.read().await.root.hash
    }

    /// Number of stored identifiers.
    pub async fn item_count(&self) -> u64 {
        self.state.read().await.root.item_count
    }

    /// Describe the node at `prefix` and its immediate children.
    pub async fn get_node_metadata(&self, prefix: &[u8]) -> Result<Option<NodeMetadata>> {
        let state = self.state.read().await;
        let Some(node) = self.resolve(&state.root, prefix).await? else {
            return Ok(None);
        };

        Ok(Some(NodeMetadata {
            prefix: prefix.to_vec(),
            item_count: node.item_count,
            hash: node.hash,
            children: node.child_summaries(),
        }))
    }

    /// Every identifier stored under `prefix`, ascending.
    pub async fn get_all_values(&self, prefix: &[u8]) -> Result<Vec<SyncId>> {
        let state = self.state.read().await;
        let Some(node) = self.resolve(&state.root, prefix).await? else {
            return Ok(Vec::new());
        };

        let mut values = Vec::new();
        let mut unloaded = Vec::new();
        node.collect_values(&mut prefix.to_vec(), &mut values, &mut unloaded);
        for path in unloaded {
            values.extend(self.nodes.leaf_ids(&path).await?);
        }

        values.sort();
        Ok(values)
    }

    /// Number of materialized nodes in memory, excluding the root.
    pub async fn loaded_node_count(&self) -> usize {
        self.state.read().await.root.loaded_descendants()
    }

    /// Number of node records persisted in this trie's namespace.
    pub async fn persisted_node_count(&self) -> Result<usize> {
        Ok(self.nodes.count().await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read path
    // ─────────────────────────────────────────────────────────────────────────

    /// Find the node at `path`, loading unloaded subtrees into private
    /// copies rather than the shared view.
    pub(crate) async fn resolve<'a>(
        &self,
        root: &'a TrieNode,
        path: &[u8],
    ) -> Result<Option<Cow<'a, TrieNode>>> {
        let mut current = Cow::Borrowed(root);
        for depth in 0..path.len() {
            match self.child(current, &path[..=depth]).await? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Step from `node` to its child named by the last byte of `path`.
    pub(crate) async fn child<'a>(
        &self,
        node: Cow<'a, TrieNode>,
        path: &[u8],
    ) -> Result<Option<Cow<'a, TrieNode>>> {
        let Some(&byte) = path.last() else {
            return Ok(Some(node));
        };

        let next = match node {
            Cow::Borrowed(node) => match node.children.get(&byte) {
                None => None,
                Some(ChildRef::Loaded(child)) => Some(Cow::Borrowed(child.as_ref())),
                Some(ChildRef::Unloaded(summary)) => {
                    Some(Cow::Owned(self.load_child(path, summary).await?))
                }
            },
            Cow::Owned(node) => match node.children.get(&byte) {
                None => None,
                Some(ChildRef::Loaded(child)) => Some(Cow::Owned(child.as_ref().clone())),
                Some(ChildRef::Unloaded(summary)) => {
                    Some(Cow::Owned(self.load_child(path, summary).await?))
                }
            },
        };
        Ok(next)
    }

    async fn load_child(&self, path: &[u8], expected: &ChildSummary) -> Result<TrieNode> {
        load_node(&self.nodes, path, expected).await
    }
}

/// Load the record at `path` and check it against the parent's summary.
async fn load_node<S: KvStore>(
    nodes: &TrieNodeStore<S>,
    path: &[u8],
    expected: &ChildSummary,
) -> Result<TrieNode> {
    let record = nodes
        .load(path)
        .await?
        .ok_or_else(|| TrieError::MissingNode(hex::encode(path)))?;

    if record.summary() != *expected {
        return Err(TrieError::MalformedRecord(format!(
            "{}: record does not match parent summary",
            hex::encode(path)
        )));
    }
    Ok(TrieNode::from_record(record))
}

/// Load every unloaded child along `path` into the shared view.
///
/// Stops at the first absent child. Loading only adds committed data, so a
/// failure here leaves the view consistent with storage.
async fn materialize_path<S: KvStore>(
    root: &mut TrieNode,
    path: &[u8],
    nodes: &TrieNodeStore<S>,
) -> Result<()> {
    let mut node = root;
    for depth in 0..path.len() {
        let Some(child) = node.children.get_mut(&path[depth]) else {
            return Ok(());
        };

        if let ChildRef::Unloaded(summary) = *child {
            let loaded = load_node(nodes, &path[..=depth], &summary).await?;
            *child = ChildRef::Loaded(Box::new(loaded));
        }

        node = match child {
            ChildRef::Loaded(loaded) => loaded.as_mut(),
            ChildRef::Unloaded(_) => {
                return Err(TrieError::NotMaterialized(hex::encode(&path[..=depth])))
            }
        };
    }
    Ok(())
}
