//! # Sync Trie Testkit
//!
//! Testing utilities for the sync trie.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Generators**: Proptest strategies for identifiers and mutation sequences
//! - **Fixtures**: Deterministic identifiers, pre-populated tries, and a
//!   store whose commits fail on demand
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use synctrie_testkit::generators::sync_id_set;
//!
//! proptest! {
//!     #[test]
//!     fn ids_are_distinct(ids in sync_id_set(32)) {
//!         let mut sorted = ids.clone();
//!         sorted.dedup();
//!         prop_assert_eq!(sorted.len(), ids.len());
//!     }
//! }
//! ```
//!
//! ## Fault Injection
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use synctrie_store::MemoryStore;
//! use synctrie_testkit::FlakyStore;
//!
//! let store = Arc::new(FlakyStore::new(MemoryStore::new()));
//! store.set_failing(true);
//! // every commit now returns StoreError::Commit
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    memory_trie, populated_trie, random_sync_id, sequential_ids, sync_id_at, trie_with_timestamps, FlakyStore,
    MemoryTrie, SAMPLE_TIMESTAMPS,
};
pub use generators::{sync_id, sync_id_set, trie_ops, TrieOp};
