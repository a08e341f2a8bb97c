//! In-memory node graph.
//!
//! A node owns its children, each of which is either a summary (digest and
//! count, loaded on demand from the store) or a fully materialized node.
//! Mutations here are synchronous: the engine loads the path first, then
//! calls [`TrieNode::insert`] or [`TrieNode::delete`], which recompute digests
//! on the way back up and record every node that must be written.

use std::collections::BTreeMap;

use synctrie_core::{
    combine_hashes, leaf_hash, ChildSummary, NodeRecord, SyncId, TrieHash, SYNC_ID_LENGTH,
};

use crate::error::{Result, TrieError};

/// A child slot.
#[derive(Debug, Clone)]
pub(crate) enum ChildRef {
    /// Only the summary is in memory.
    Unloaded(ChildSummary),
    /// The node is materialized.
    Loaded(Box<TrieNode>),
}

impl ChildRef {
    pub(crate) fn summary(&self) -> ChildSummary {
        match self {
            ChildRef::Unloaded(summary) => *summary,
            ChildRef::Loaded(node) => node.summary(),
        }
    }

    pub(crate) fn hash(&self) -> TrieHash {
        self.summary().hash
    }
}

/// A write produced by a mutation, keyed by node path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeWrite {
    Put(Vec<u8>, NodeRecord),
    Delete(Vec<u8>),
}

/// One node of the trie.
#[derive(Debug, Clone, Default)]
pub(crate) struct TrieNode {
    pub(crate) hash: TrieHash,
    pub(crate) item_count: u64,
    pub(crate) key: Option<SyncId>,
    pub(crate) children: BTreeMap<u8, ChildRef>,
}

impl TrieNode {
    /// A node holding nothing.
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    /// Rebuild a node from its record; children start unloaded.
    pub(crate) fn from_record(record: NodeRecord) -> Self {
        Self {
            hash: record.hash,
            item_count: record.item_count,
            key: record.key,
            children: record
                .children
                .into_iter()
                .map(|(byte, summary)| (byte, ChildRef::Unloaded(summary)))
                .collect(),
        }
    }

    pub(crate) fn to_record(&self) -> NodeRecord {
        NodeRecord {
            hash: self.hash,
            item_count: self.item_count,
            key: self.key,
            children: self.child_summaries(),
        }
    }

    pub(crate) fn summary(&self) -> ChildSummary {
        ChildSummary {
            hash: self.hash,
            item_count: self.item_count,
        }
    }

    pub(crate) fn child_summaries(&self) -> BTreeMap<u8, ChildSummary> {
        self.children
            .iter()
            .map(|(byte, child)| (*byte, child.summary()))
            .collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.key.is_none() && self.children.is_empty()
    }

    /// Copy of this node with every child downgraded to its summary.
    pub(crate) fn unloaded_view(&self) -> Self {
        Self {
            hash: self.hash,
            item_count: self.item_count,
            key: self.key,
            children: self
                .children
                .iter()
                .map(|(byte, child)| (*byte, ChildRef::Unloaded(child.summary())))
                .collect(),
        }
    }

    /// Downgrade loaded children to summaries. Returns how many changed.
    pub(crate) fn unload_children(&mut self) -> usize {
        let mut unloaded = 0;
        for child in self.children.values_mut() {
            if let ChildRef::Loaded(node) = child {
                *child = ChildRef::Unloaded(node.summary());
                unloaded += 1;
            }
        }
        unloaded
    }

    /// Digest of every child except `byte`, in ascending order.
    pub(crate) fn excluded_hash(&self, byte: u8) -> TrieHash {
        let hashes: Vec<TrieHash> = self
            .children
            .iter()
            .filter(|(b, _)| **b != byte)
            .map(|(_, child)| child.hash())
            .collect();
        combine_hashes(&hashes)
    }

    /// Number of materialized nodes below this one.
    pub(crate) fn loaded_descendants(&self) -> usize {
        self.children
            .values()
            .map(|child| match child {
                ChildRef::Loaded(node) => 1 + node.loaded_descendants(),
                ChildRef::Unloaded(_) => 0,
            })
            .sum()
    }

    /// Gather stored identifiers from loaded nodes, and the paths of
    /// unloaded subtrees that still need a store scan.
    pub(crate) fn collect_values(
        &self,
        path: &mut Vec<u8>,
        values: &mut Vec<SyncId>,
        unloaded: &mut Vec<Vec<u8>>,
    ) {
        if let Some(key) = self.key {
            values.push(key);
        }
        for (byte, child) in &self.children {
            path.push(*byte);
            match child {
                ChildRef::Loaded(node) => node.collect_values(path, values, unloaded),
                ChildRef::Unloaded(_) => unloaded.push(path.clone()),
            }
            path.pop();
        }
    }

    fn recompute(&mut self) {
        if self.key.is_some() {
            return;
        }
        let hashes: Vec<TrieHash> = self.children.values().map(ChildRef::hash).collect();
        self.hash = combine_hashes(&hashes);
        self.item_count = self.children.values().map(|c| c.summary().item_count).sum();
    }

    fn record_write(&self, path: &[u8], writes: &mut Vec<NodeWrite>) {
        if self.is_empty() {
            writes.push(NodeWrite::Delete(path.to_vec()));
        } else {
            writes.push(NodeWrite::Put(path.to_vec(), self.to_record()));
        }
    }

    /// Add `id` below this node, which sits at `depth`.
    ///
    /// Every child on the path must already be loaded. Returns `false` if
    /// the identifier was already present, in which case nothing is written.
    pub(crate) fn insert(
        &mut self,
        id: &SyncId,
        depth: usize,
        writes: &mut Vec<NodeWrite>,
    ) -> Result<bool> {
        let path = &id.as_bytes()[..depth];

        if depth == SYNC_ID_LENGTH {
            if self.key.is_some() {
                return Ok(false);
            }
            *self = Self {
                hash: leaf_hash(id),
                item_count: 1,
                key: Some(*id),
                children: BTreeMap::new(),
            };
            self.record_write(path, writes);
            return Ok(true);
        }

        let byte = id.as_bytes()[depth];
        let child = self
            .children
            .entry(byte)
            .or_insert_with(|| ChildRef::Loaded(Box::new(TrieNode::empty())));
        let child = match child {
            ChildRef::Loaded(node) => node,
            ChildRef::Unloaded(_) => {
                return Err(TrieError::NotMaterialized(hex::encode(&id.as_bytes()[..=depth])))
            }
        };

        if !child.insert(id, depth + 1, writes)? {
            return Ok(false);
        }

        self.recompute();
        self.record_write(path, writes);
        Ok(true)
    }

    /// Remove `id` from below this node, which sits at `depth`, compacting
    /// nodes that become empty.
    ///
    /// Returns `false` if the identifier was absent, in which case nothing is
    /// written.
    pub(crate) fn delete(
        &mut self,
        id: &SyncId,
        depth: usize,
        writes: &mut Vec<NodeWrite>,
    ) -> Result<bool> {
        let path = &id.as_bytes()[..depth];

        if depth == SYNC_ID_LENGTH {
            if self.key.as_ref() != Some(id) {
                return Ok(false);
            }
            *self = TrieNode::empty();
            self.record_write(path, writes);
            return Ok(true);
        }

        let byte = id.as_bytes()[depth];
        let Some(child) = self.children.get_mut(&byte) else {
            return Ok(false);
        };
        let child = match child {
            ChildRef::Loaded(node) => node,
            ChildRef::Unloaded(_) => {
                return Err(TrieError::NotMaterialized(hex::encode(&id.as_bytes()[..=depth])))
            }
        };

        if !child.delete(id, depth + 1, writes)? {
            return Ok(false);
        }
        if child.is_empty() {
            self.children.remove(&byte);
        }

        self.recompute();
        self.record_write(path, writes);
        Ok(true)
    }
}
