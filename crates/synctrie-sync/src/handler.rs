//! Answering sync requests from a local trie.

use synctrie_store::KvStore;
use synctrie_trie::MerkleTrie;

use crate::messages::{limits, SyncErrorCode, SyncRequest, SyncResponse};

/// Answer `request` from `trie`.
///
/// Failures are reported in-band as [`SyncResponse::Error`] so the caller can
/// always send something back.
pub async fn handle_request<S: KvStore>(trie: &MerkleTrie<S>, request: SyncRequest) -> SyncResponse {
    if let Err(reason) = request.validate_limits() {
        tracing::warn!(reason, "rejected sync request");
        return SyncResponse::error(SyncErrorCode::InvalidRequest, reason);
    }

    let response = match &request {
        SyncRequest::GetSnapshot { prefix } => trie.get_snapshot(prefix).await.map(SyncResponse::Snapshot),
        SyncRequest::GetMetadata { prefix } => {
            trie.get_node_metadata(prefix).await.map(SyncResponse::Metadata)
        }
        SyncRequest::GetSyncIds { prefix } => trie.get_all_values(prefix).await.map(SyncResponse::SyncIds),
    };

    match response {
        Ok(SyncResponse::SyncIds(ids)) if ids.len() > limits::MAX_SYNC_IDS_PER_MESSAGE => {
            SyncResponse::error(
                SyncErrorCode::TooLarge,
                format!("{} identifiers under prefix", ids.len()),
            )
        }
        Ok(response) => response,
        Err(err) => {
            tracing::error!(error = %err, prefix = %hex::encode(request.prefix()), "sync request failed");
            SyncResponse::error(SyncErrorCode::Internal, err.to_string())
        }
    }
}
