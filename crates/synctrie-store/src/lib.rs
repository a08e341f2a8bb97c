//! # Sync Trie Store
//!
//! Storage abstraction for the sync trie. Provides a trait-based interface
//! for ordered key-value persistence with SQLite and in-memory
//! implementations, plus the node-record layer the trie reads through.
//!
//! ## Key Types
//!
//! - [`KvStore`] - The async trait for point reads, prefix scans and atomic commits
//! - [`Transaction`] - An ordered batch of puts and deletes
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`TrieNodeStore`] - Encodes, validates and stages trie node records
//!
//! ## Usage
//!
//! ```rust,no_run
//! use synctrie_store::{KvStore, SqliteStore, Transaction};
//!
//! async fn example() {
//!     let store = SqliteStore::open("trie.db").unwrap();
//!
//!     let mut tx = Transaction::new();
//!     tx.put(b"key".to_vec(), b"value".to_vec());
//!     store.commit(tx).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Atomic batches**: a commit applies every staged operation or none
//! - **Namespaced records**: trie nodes live under a one-byte namespace so
//!   several tries, or unrelated data, can share one store

pub mod error;
pub mod memory;
pub mod migration;
pub mod nodes;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use nodes::{TrieNodeStore, DEFAULT_NAMESPACE};
pub use sqlite::SqliteStore;
pub use traits::{prefix_successor, KvStore, Transaction, WriteOp};
