//! # Sync Trie Engine
//!
//! A persistent Merkle-radix trie over fixed-length [`SyncId`]s. Every node
//! carries a digest of its subtree, so two replicas can compare a single
//! root digest, and a per-level snapshot, to find where their sets differ.
//!
//! ## Key Types
//!
//! - [`MerkleTrie`] - The engine: insert, delete, queries, snapshots
//! - [`TrieConfig`] - Namespace and memory settings
//! - [`IntegrityReport`] - Result of a full consistency check
//!
//! ## Usage
//!
//! ```rust,no_run
//! use synctrie_core::SyncId;
//! use synctrie_store::MemoryStore;
//! use synctrie_trie::{MerkleTrie, TrieConfig};
//!
//! async fn example() {
//!     let trie = MerkleTrie::open(MemoryStore::new(), TrieConfig::default())
//!         .await
//!         .unwrap();
//!
//!     let id = SyncId::new(1665182332, &[7u8; 20]).unwrap();
//!     assert!(trie.insert(&id).await.unwrap());
//!
//!     let snapshot = trie.get_snapshot(b"1665182332").await.unwrap();
//!     assert_eq!(snapshot.excluded_hashes.len(), 10);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Uncompressed paths**: every identifier produces one node per byte
//! - **Lazy loading**: children are summaries until a mutation or read needs them
//! - **All-or-nothing mutations**: one store transaction per insert or delete;
//!   a failed commit restores the last committed view
//!
//! [`SyncId`]: synctrie_core::SyncId

pub mod config;
pub mod error;
pub mod integrity;
mod node;
pub mod snapshot;
pub mod trie;

pub use config::TrieConfig;
pub use error::{Result, TrieError};
pub use integrity::IntegrityReport;
pub use snapshot::divergence_prefix;
pub use trie::MerkleTrie;
