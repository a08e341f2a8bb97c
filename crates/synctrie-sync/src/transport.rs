//! Transport abstraction for the sync protocol.
//!
//! The transport layer carries one encoded request to a replica and brings
//! its response back. Implementations may use TCP, HTTP, or any other
//! request/response channel.

use async_trait::async_trait;
use synctrie_core::{NodeMetadata, SyncId, TrieSnapshot};

use crate::error::{Result, SyncError};
use crate::messages::{SyncRequest, SyncResponse};
use crate::peer::SyncPeer;

/// Request/response exchange with one remote replica.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and wait for the matching response.
    async fn request(&self, request: SyncRequest) -> Result<SyncResponse>;
}

/// A replica reached through a [`Transport`].
pub struct RemotePeer<T> {
    transport: T,
}

impl<T: Transport> RemotePeer<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call(&self, request: SyncRequest) -> Result<SyncResponse> {
        match self.transport.request(request).await? {
            SyncResponse::Error { code, message } => Err(SyncError::PeerError { code, message }),
            response => Ok(response),
        }
    }
}

#[async_trait]
impl<T: Transport> SyncPeer for RemotePeer<T> {
    async fn snapshot(&self, prefix: &[u8]) -> Result<TrieSnapshot> {
        let request = SyncRequest::GetSnapshot {
            prefix: prefix.to_vec(),
        };
        match self.call(request).await? {
            SyncResponse::Snapshot(snapshot) => Ok(snapshot),
            _ => Err(SyncError::UnexpectedResponse("snapshot")),
        }
    }

    async fn node_metadata(&self, prefix: &[u8]) -> Result<Option<NodeMetadata>> {
        let request = SyncRequest::GetMetadata {
            prefix: prefix.to_vec(),
        };
        match self.call(request).await? {
            SyncResponse::Metadata(meta) => Ok(meta),
            _ => Err(SyncError::UnexpectedResponse("metadata")),
        }
    }

    async fn sync_ids(&self, prefix: &[u8]) -> Result<Vec<SyncId>> {
        let request = SyncRequest::GetSyncIds {
            prefix: prefix.to_vec(),
        };
        match self.call(request).await? {
            SyncResponse::SyncIds(ids) => Ok(ids),
            _ => Err(SyncError::UnexpectedResponse("sync ids")),
        }
    }
}

/// A simple in-memory transport for testing.
///
/// Uses channels to carry CBOR-encoded messages to a task serving a trie.
pub mod memory {
    use super::*;
    use std::sync::Arc;

    use synctrie_store::KvStore;
    use synctrie_trie::MerkleTrie;
    use tokio::sync::{mpsc, oneshot};
    use tokio::task::JoinHandle;

    use crate::handler::handle_request;
    use crate::messages::SyncErrorCode;

    const CHANNEL_CAPACITY: usize = 1000;

    /// One encoded request and where to send the encoded answer.
    struct Envelope {
        request: Vec<u8>,
        reply: oneshot::Sender<Vec<u8>>,
    }

    /// Client half of an in-memory connection.
    #[derive(Clone)]
    pub struct MemoryTransport {
        sender: mpsc::Sender<Envelope>,
    }

    /// Serve `trie` on a background task and return a transport to it.
    ///
    /// The task exits once every clone of the transport is dropped.
    pub fn connect<S>(trie: Arc<MerkleTrie<S>>) -> (MemoryTransport, JoinHandle<()>)
    where
        S: KvStore + 'static,
    {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let handle = tokio::spawn(serve(trie, rx));
        (MemoryTransport { sender: tx }, handle)
    }

    async fn serve<S: KvStore>(trie: Arc<MerkleTrie<S>>, mut rx: mpsc::Receiver<Envelope>) {
        while let Some(envelope) = rx.recv().await {
            let response = match SyncRequest::from_cbor(&envelope.request) {
                Ok(request) => handle_request(&trie, request).await,
                Err(err) => SyncResponse::error(SyncErrorCode::InvalidRequest, err.to_string()),
            };

            let bytes = match response.to_cbor() {
                Ok(bytes) => bytes,
                Err(err) => {
                    match SyncResponse::error(SyncErrorCode::TooLarge, err.to_string()).to_cbor() {
                        Ok(bytes) => bytes,
                        Err(_) => continue,
                    }
                }
            };

            // The requester may have timed out and gone away.
            let _ = envelope.reply.send(bytes);
        }
        tracing::debug!("memory transport closed");
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn request(&self, request: SyncRequest) -> Result<SyncResponse> {
            let (reply, response) = oneshot::channel();
            let envelope = Envelope {
                request: request.to_cbor()?,
                reply,
            };

            self.sender
                .send(envelope)
                .await
                .map_err(|_| SyncError::TransportError("peer disconnected".into()))?;

            let bytes = response
                .await
                .map_err(|_| SyncError::TransportError("peer dropped request".into()))?;
            SyncResponse::from_cbor(&bytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::connect;
    use super::*;
    use crate::messages::SyncErrorCode;
    use std::sync::Arc;
    use synctrie_store::MemoryStore;
    use synctrie_trie::{MerkleTrie, TrieConfig};

    fn sync_id(ts: u64, n: u32) -> SyncId {
        let hash = blake3::hash(&n.to_be_bytes());
        SyncId::new(ts, &hash.as_bytes()[..20]).unwrap()
    }

    async fn served_trie(ids: &[SyncId]) -> Arc<MerkleTrie<MemoryStore>> {
        let trie = Arc::new(MerkleTrie::new(MemoryStore::new(), TrieConfig::default()));
        for id in ids {
            trie.insert(id).await.unwrap();
        }
        trie
    }

    #[tokio::test]
    async fn test_remote_peer_matches_local_answers() {
        let ids: Vec<SyncId> = (0..20).map(|n| sync_id(1665182332 + n as u64, n)).collect();
        let trie = served_trie(&ids).await;
        let (transport, _task) = connect(Arc::clone(&trie));
        let remote = RemotePeer::new(transport);

        assert_eq!(
            remote.snapshot(b"1665182").await.unwrap(),
            trie.get_snapshot(b"1665182").await.unwrap()
        );
        assert_eq!(
            remote.node_metadata(b"16651823").await.unwrap(),
            trie.get_node_metadata(b"16651823").await.unwrap()
        );
        assert_eq!(remote.node_metadata(b"9").await.unwrap(), None);
        assert_eq!(remote.sync_ids(b"").await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_oversized_prefix_is_rejected_by_peer() {
        let trie = served_trie(&[]).await;
        let (transport, _task) = connect(trie);

        let response = transport
            .request(SyncRequest::GetSnapshot { prefix: vec![b'1'; 31] })
            .await
            .unwrap();
        assert!(matches!(
            response,
            SyncResponse::Error { code: SyncErrorCode::InvalidRequest, .. }
        ));

        let remote = RemotePeer::new(transport);
        let err = remote.snapshot(&[b'1'; 31]).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::PeerError { code: SyncErrorCode::InvalidRequest, .. }
        ));
    }

    #[tokio::test]
    async fn test_too_many_ids_reported_as_too_large() {
        let ids: Vec<SyncId> = (0..1025).map(|n| sync_id(1665182332, n)).collect();
        let trie = served_trie(&ids).await;
        let (transport, _task) = connect(trie);
        let remote = RemotePeer::new(transport);

        let err = remote.sync_ids(b"").await.unwrap_err();
        assert!(matches!(err, SyncError::PeerError { code: SyncErrorCode::TooLarge, .. }));
    }

    #[tokio::test]
    async fn test_closed_server_is_transport_error() {
        let trie = served_trie(&[]).await;
        let (transport, task) = connect(trie);
        task.abort();
        let _ = task.await;

        let err = transport
            .request(SyncRequest::GetSyncIds { prefix: Vec::new() })
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::TransportError(_)));
    }
}
