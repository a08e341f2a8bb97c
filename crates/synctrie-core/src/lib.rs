//! # Sync Trie Core
//!
//! Pure primitives for the sync trie: identifiers, digests, and node records.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over the data that the trie engine persists and exchanges with peers.
//!
//! ## Key Types
//!
//! - [`SyncId`] - Fixed-length identifier of one stored item (timestamp prefix + hash suffix)
//! - [`TrieHash`] - 20-byte BLAKE3 digest summarizing a subtree
//! - [`TrieHasher`] - Incremental hasher over several child digests
//! - [`NodeRecord`] - Persisted form of one trie node
//! - [`NodeMetadata`] / [`TrieSnapshot`] - Read-side summaries exchanged during sync
//!
//! ## Encoding
//!
//! Node records are encoded as CBOR maps with small integer keys. See [`node`].

pub mod error;
pub mod hash;
pub mod metadata;
pub mod node;
pub mod types;

pub use error::{CoreError, Result};
pub use hash::{combine_hashes, leaf_hash, TrieHash, TrieHasher, DIGEST_LENGTH};
pub use metadata::{ChildSummary, NodeMetadata, TrieSnapshot};
pub use node::NodeRecord;
pub use types::{
    timestamp_prefix, SyncId, HASH_LENGTH, MAX_TIMESTAMP, SYNC_ID_LENGTH, TIMESTAMP_LENGTH,
};
