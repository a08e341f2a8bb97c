//! # Sync Trie Reconciliation
//!
//! Anti-entropy between two sync trie replicas.
//!
//! ## Overview
//!
//! One side asks the other for a snapshot of a prefix, compares excluded
//! hashes level by level to find where the replicas stop agreeing, and then
//! walks the peer's node metadata below that point. Only subtrees whose
//! digests differ are visited; small ones are fetched as identifier lists.
//!
//! ## Key Properties
//!
//! - **Read-only by default**: [`SyncSession::run`] reports, [`SyncSession::pull`] inserts
//! - **Bounded**: every message obeys [`limits`], every session a node budget
//! - **Transport-agnostic**: anything implementing [`Transport`] can carry requests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use synctrie_store::MemoryStore;
//! use synctrie_sync::{memory, RemotePeer, SyncConfig, SyncSession};
//! use synctrie_trie::{MerkleTrie, TrieConfig};
//!
//! async fn example() {
//!     let local = Arc::new(MerkleTrie::new(MemoryStore::new(), TrieConfig::default()));
//!     let remote = Arc::new(MerkleTrie::new(MemoryStore::new(), TrieConfig::default()));
//!
//!     let (transport, _server) = memory::connect(remote);
//!     let session = SyncSession::new(local, RemotePeer::new(transport), SyncConfig::default());
//!
//!     let report = session.pull(b"").await.unwrap();
//!     println!("pulled {} identifiers", report.inserted);
//! }
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! Local                               Peer
//!   |-------- GetSnapshot ------------>|
//!   |<------- Snapshot ----------------|
//!   |-------- GetMetadata ------------>|   repeated per differing node
//!   |<------- Metadata ----------------|
//!   |-------- GetSyncIds ------------->|   once a subtree is small enough
//!   |<------- SyncIds -----------------|
//! ```

pub mod error;
pub mod handler;
pub mod messages;
pub mod peer;
pub mod protocol;
pub mod transport;

pub use error::{Result, SyncError};
pub use handler::handle_request;
pub use messages::{limits, SyncErrorCode, SyncRequest, SyncResponse, PROTOCOL_VERSION};
pub use peer::SyncPeer;
pub use protocol::{SyncConfig, SyncReport, SyncSession};
pub use transport::{memory, memory::MemoryTransport, RemotePeer, Transport};
