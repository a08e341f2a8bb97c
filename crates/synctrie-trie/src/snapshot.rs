//! Snapshot and divergence queries.
//!
//! A snapshot records, for each level along a prefix, the digest of every
//! sibling off the path. Two replicas compare these lists to find the longest
//! prefix under which everything outside the path already agrees; only the
//! subtree below that prefix needs to be exchanged.

use std::borrow::Cow;

use synctrie_core::{TrieHash, TrieSnapshot};
use synctrie_store::KvStore;

use crate::error::Result;
use crate::trie::MerkleTrie;

impl<S: KvStore> MerkleTrie<S> {
    /// Summarize the trie along `prefix`.
    ///
    /// The walk stops at the first byte with no child. That level is still
    /// recorded, so the returned prefix is the matched part plus the missing
    /// byte, and `item_count` is the count at the deepest node reached.
    pub async fn get_snapshot(&self, prefix: &[u8]) -> Result<TrieSnapshot> {
        let state = self.state.read().await;
        let mut excluded_hashes = Vec::with_capacity(prefix.len());
        let mut current = Cow::Borrowed(&state.root);

        for (depth, &byte) in prefix.iter().enumerate() {
            excluded_hashes.push(current.excluded_hash(byte));
            let item_count = current.item_count;

            match self.child(current, &prefix[..=depth]).await? {
                Some(next) => current = next,
                None => {
                    return Ok(TrieSnapshot {
                        prefix: prefix[..=depth].to_vec(),
                        excluded_hashes,
                        item_count,
                    })
                }
            }
        }

        Ok(TrieSnapshot {
            prefix: prefix.to_vec(),
            excluded_hashes,
            item_count: current.item_count,
        })
    }

    /// Longest prefix of `prefix` whose local excluded hashes match
    /// `peer_excluded_hashes` level by level.
    ///
    /// Empty when the peer sent no hashes.
    pub async fn get_divergence_prefix(
        &self,
        prefix: &[u8],
        peer_excluded_hashes: &[TrieHash],
    ) -> Result<Vec<u8>> {
        if peer_excluded_hashes.is_empty() {
            return Ok(Vec::new());
        }

        let ours = self.get_snapshot(prefix).await?;
        Ok(divergence_prefix(prefix, &ours.excluded_hashes, peer_excluded_hashes).to_vec())
    }
}

/// Compare two excluded-hash lists along `prefix`.
///
/// Returns `prefix` cut at the first level where the lists differ, where
/// `ours` runs out, or at the shorter of `prefix` and `theirs`.
pub fn divergence_prefix<'p>(prefix: &'p [u8], ours: &[TrieHash], theirs: &[TrieHash]) -> &'p [u8] {
    let limit = prefix.len().min(theirs.len());
    for (i, hash) in theirs.iter().enumerate().take(limit) {
        if ours.get(i) != Some(hash) {
            return &prefix[..i];
        }
    }
    &prefix[..limit]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(n: u8) -> TrieHash {
        TrieHash::digest(&[n])
    }

    #[test]
    fn test_identical_lists_match_whole_prefix() {
        let hashes = [h(1), h(2), h(3)];
        assert_eq!(divergence_prefix(b"abc", &hashes, &hashes), b"abc");
    }

    #[test]
    fn test_stops_at_first_mismatch() {
        let ours = [h(1), h(2), h(3)];
        let theirs = [h(1), h(9), h(3)];
        assert_eq!(divergence_prefix(b"abc", &ours, &theirs), b"a");
    }

    #[test]
    fn test_bounded_by_shorter_inputs() {
        let ours = [h(1), h(2), h(3)];
        assert_eq!(divergence_prefix(b"abc", &ours, &ours[..2]), b"ab");
        assert_eq!(divergence_prefix(b"ab", &ours, &ours), b"ab");
        assert_eq!(divergence_prefix(b"abc", &ours[..1], &ours), b"a");
        assert_eq!(divergence_prefix(b"abc", &ours, &[]), b"");
    }
}
