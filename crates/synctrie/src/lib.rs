//! # Sync Trie
//!
//! A persistent Merkle-radix trie for anti-entropy set reconciliation.
//!
//! ## Overview
//!
//! Each replica stores a set of fixed-length identifiers whose leading bytes
//! encode a timestamp. The trie keeps a digest at every node, so replicas can:
//!
//! - **Compare**: one root digest says whether two sets are equal
//! - **Localize**: per-level snapshots find the deepest prefix that differs
//! - **Reconcile**: a walk below that prefix fetches only what is missing
//! - **Persist**: every node lives in a key-value store, loaded on demand
//!
//! ## Usage
//!
//! ```rust,no_run
//! use synctrie::{open_memory, ReplicaConfig};
//! use synctrie::core::SyncId;
//!
//! async fn example() {
//!     let alice = open_memory(ReplicaConfig::default()).await.unwrap();
//!     let bob = open_memory(ReplicaConfig::default()).await.unwrap();
//!
//!     let id = SyncId::new(1665182332, &[7u8; 20]).unwrap();
//!     bob.trie().insert(&id).await.unwrap();
//!
//!     // Pull over an in-memory transport
//!     let (transport, _server) = bob.serve_memory();
//!     let peer = synctrie::sync::RemotePeer::new(transport);
//!     let report = alice.pull_from(peer, b"").await.unwrap();
//!     assert_eq!(report.inserted, 1);
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `synctrie::core` - Identifiers, digests, node records
//! - `synctrie::store` - Storage abstraction, memory and SQLite backends
//! - `synctrie::trie` - The trie engine
//! - `synctrie::sync` - Reconciliation protocol

pub mod error;
pub mod replica;

// Re-export component crates
pub use synctrie_core as core;
pub use synctrie_store as store;
pub use synctrie_sync as sync;
pub use synctrie_trie as trie;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use replica::{open_memory, open_sqlite, Replica, ReplicaConfig};

// Re-export commonly used types
pub use synctrie_core::{NodeMetadata, SyncId, TrieHash, TrieSnapshot};
pub use synctrie_store::{KvStore, MemoryStore, SqliteStore};
pub use synctrie_sync::{SyncConfig, SyncReport};
pub use synctrie_trie::{MerkleTrie, TrieConfig};
