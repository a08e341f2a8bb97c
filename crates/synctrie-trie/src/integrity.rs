//! Offline consistency check of the persisted trie.

use std::collections::BTreeMap;

use synctrie_core::{combine_hashes, NodeRecord, TrieHash, SYNC_ID_LENGTH};
use synctrie_store::KvStore;

use crate::error::{Result, TrieError};
use crate::trie::MerkleTrie;

/// Totals gathered by [`MerkleTrie::verify_integrity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntegrityReport {
    /// Records checked, root included.
    pub nodes: usize,
    /// Leaf records.
    pub leaves: usize,
}

impl<S: KvStore> MerkleTrie<S> {
    /// Re-derive every persisted digest and count and check that records
    /// form a single compacted tree matching the in-memory root.
    ///
    /// Reads the whole namespace; meant for tests and operators.
    pub async fn verify_integrity(&self) -> Result<IntegrityReport> {
        let state = self.state.read().await;
        let records: BTreeMap<Vec<u8>, NodeRecord> =
            self.nodes.scan(&[]).await?.into_iter().collect();

        match records.get(&[][..]) {
            Some(root) if root.hash != state.root.hash || root.item_count != state.root.item_count => {
                return Err(violation(&[], "root record differs from loaded root"));
            }
            None if !state.root.hash.is_empty() || state.root.item_count != 0 => {
                return Err(violation(&[], "missing root record for non-empty trie"));
            }
            None if !records.is_empty() => {
                return Err(violation(&[], "records present without a root"));
            }
            _ => {}
        }

        let mut report = IntegrityReport::default();
        for (path, record) in &records {
            report.nodes += 1;

            if let Some((&byte, parent)) = path.split_last() {
                let listed = records
                    .get(parent)
                    .map_or(false, |p| p.children.contains_key(&byte));
                if !listed {
                    return Err(violation(path, "orphaned record"));
                }
            }

            if path.len() == SYNC_ID_LENGTH {
                report.leaves += 1;
                if record.key.as_ref().map(|k| &k.as_bytes()[..]) != Some(path.as_slice()) {
                    return Err(violation(path, "leaf key does not match its path"));
                }
                continue;
            }

            let hashes: Vec<TrieHash> = record.children.values().map(|c| c.hash).collect();
            if combine_hashes(&hashes) != record.hash {
                return Err(violation(path, "digest does not match children"));
            }

            for (byte, summary) in &record.children {
                let mut child_path = path.clone();
                child_path.push(*byte);
                match records.get(&child_path) {
                    Some(child) if child.summary() == *summary => {}
                    Some(_) => {
                        return Err(violation(&child_path, "child differs from parent summary"))
                    }
                    None => return Err(violation(&child_path, "child record missing")),
                }
            }
        }

        Ok(report)
    }
}

fn violation(path: &[u8], reason: &str) -> TrieError {
    TrieError::Integrity {
        path: hex::encode(path),
        reason: reason.to_string(),
    }
}
