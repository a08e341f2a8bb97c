//! Read-side summaries of the trie.
//!
//! These are the shapes the engine hands to the sync layer and that peers
//! exchange over the wire.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::hash::TrieHash;

/// Digest and item count of one child, known without loading it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildSummary {
    pub hash: TrieHash,
    pub item_count: u64,
}

/// Description of one node and its immediate children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Path from the root to this node.
    pub prefix: Vec<u8>,
    /// Items stored under this node.
    pub item_count: u64,
    /// Digest of this node.
    pub hash: TrieHash,
    /// Summaries of the populated children, keyed by byte.
    pub children: BTreeMap<u8, ChildSummary>,
}

/// Per-level summary of the trie along one prefix.
///
/// `excluded_hashes[i]` digests every child at depth `i` except the one on
/// the path, so two replicas whose entries match at level `i` hold the same
/// items outside the path at that level.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrieSnapshot {
    /// The part of the requested prefix the walk reached.
    pub prefix: Vec<u8>,
    /// One digest per level of `prefix`.
    pub excluded_hashes: Vec<TrieHash>,
    /// Items under the deepest node reached.
    pub item_count: u64,
}
