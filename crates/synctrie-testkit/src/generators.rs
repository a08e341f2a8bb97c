//! Proptest generators for property-based testing.

use proptest::prelude::*;

use synctrie_core::{SyncId, TrieHash, DIGEST_LENGTH, HASH_LENGTH};

/// Generate a timestamp in the range real identifiers use.
pub fn timestamp() -> impl Strategy<Value = u64> {
    1_600_000_000u64..1_700_000_000
}

/// Generate a timestamp within a narrow window, so identifiers share long prefixes.
pub fn clustered_timestamp() -> impl Strategy<Value = u64> {
    1_665_182_300u64..1_665_182_400
}

/// Generate a random TrieHash.
pub fn trie_hash() -> impl Strategy<Value = TrieHash> {
    any::<[u8; DIGEST_LENGTH]>().prop_map(TrieHash)
}

/// Generate a random SyncId.
pub fn sync_id() -> impl Strategy<Value = SyncId> {
    (timestamp(), any::<[u8; HASH_LENGTH]>()).prop_map(id_from_parts)
}

/// Generate a SyncId from the clustered timestamp window.
pub fn clustered_sync_id() -> impl Strategy<Value = SyncId> {
    (clustered_timestamp(), any::<[u8; HASH_LENGTH]>()).prop_map(id_from_parts)
}

/// Generate up to `max` distinct identifiers, ascending.
pub fn sync_id_set(max: usize) -> impl Strategy<Value = Vec<SyncId>> {
    prop::collection::btree_set(clustered_sync_id(), 0..=max)
        .prop_map(|set| set.into_iter().collect())
}

/// One step of a random mutation sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrieOp {
    Insert(SyncId),
    Delete(SyncId),
}

impl TrieOp {
    /// The identifier this step touches.
    pub fn id(&self) -> &SyncId {
        match self {
            TrieOp::Insert(id) | TrieOp::Delete(id) => id,
        }
    }
}

/// Generate up to `max` operations over a small pool of identifiers, so
/// deletes regularly hit present items.
pub fn trie_ops(max: usize) -> impl Strategy<Value = Vec<TrieOp>> {
    prop::collection::vec(clustered_sync_id(), 1..8).prop_flat_map(move |pool| {
        let op = (prop::sample::select(pool), any::<bool>()).prop_map(|(id, insert)| {
            if insert {
                TrieOp::Insert(id)
            } else {
                TrieOp::Delete(id)
            }
        });
        prop::collection::vec(op, 0..=max)
    })
}

fn id_from_parts((timestamp, hash): (u64, [u8; HASH_LENGTH])) -> SyncId {
    match SyncId::new(timestamp, &hash) {
        Ok(id) => id,
        Err(_) => unreachable!("generated timestamps are in range"),
    }
}
