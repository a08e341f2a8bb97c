//! Sync protocol message types.
//!
//! Every exchange is a single request answered by a single response. Both
//! directions are CBOR-encoded and bounded by [`limits`].

use serde::{Deserialize, Serialize};

use synctrie_core::{NodeMetadata, SyncId, TrieSnapshot, SYNC_ID_LENGTH};

use crate::error::{Result, SyncError};

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 0;

/// Message size limits.
pub mod limits {
    use synctrie_core::SYNC_ID_LENGTH;

    /// Max bytes in a requested prefix.
    pub const MAX_PREFIX_LEN: usize = SYNC_ID_LENGTH;
    /// Max excluded hashes in one snapshot.
    pub const MAX_EXCLUDED_HASHES: usize = SYNC_ID_LENGTH;
    /// Max children listed in one metadata response.
    pub const MAX_CHILDREN: usize = 256;
    /// Max identifiers in one response.
    pub const MAX_SYNC_IDS_PER_MESSAGE: usize = 1024;
    /// Max encoded message size.
    pub const MAX_MESSAGE_BYTES: usize = 1 << 20;
}

/// A question one replica asks another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncRequest {
    /// Excluded hashes along `prefix`.
    GetSnapshot { prefix: Vec<u8> },
    /// The node at `prefix` and its children's summaries.
    GetMetadata { prefix: Vec<u8> },
    /// Every identifier under `prefix`.
    GetSyncIds { prefix: Vec<u8> },
}

/// Error codes carried in [`SyncResponse::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncErrorCode {
    /// The request broke a limit or was malformed.
    InvalidRequest,
    /// The answer would exceed a message limit.
    TooLarge,
    /// The responder failed internally.
    Internal,
}

/// An answer to a [`SyncRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncResponse {
    Snapshot(TrieSnapshot),
    Metadata(Option<NodeMetadata>),
    SyncIds(Vec<SyncId>),
    Error { code: SyncErrorCode, message: String },
}

impl SyncRequest {
    /// The prefix this request is scoped to.
    pub fn prefix(&self) -> &[u8] {
        match self {
            SyncRequest::GetSnapshot { prefix }
            | SyncRequest::GetMetadata { prefix }
            | SyncRequest::GetSyncIds { prefix } => prefix,
        }
    }

    /// Check the request against protocol limits.
    pub fn validate_limits(&self) -> std::result::Result<(), &'static str> {
        if self.prefix().len() > limits::MAX_PREFIX_LEN {
            return Err("prefix too long");
        }
        Ok(())
    }

    /// Encode to CBOR.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    /// Decode from CBOR and check limits.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        let request: Self = decode(bytes)?;
        request
            .validate_limits()
            .map_err(|e| SyncError::InvalidMessage(e.to_string()))?;
        Ok(request)
    }
}

impl SyncResponse {
    /// Build an error response.
    pub fn error(code: SyncErrorCode, message: impl Into<String>) -> Self {
        SyncResponse::Error {
            code,
            message: message.into(),
        }
    }

    /// Check the response against protocol limits.
    pub fn validate_limits(&self) -> std::result::Result<(), &'static str> {
        match self {
            SyncResponse::Snapshot(snapshot) => {
                if snapshot.excluded_hashes.len() > limits::MAX_EXCLUDED_HASHES {
                    return Err("too many excluded hashes");
                }
                if snapshot.prefix.len() > limits::MAX_PREFIX_LEN {
                    return Err("snapshot prefix too long");
                }
            }
            SyncResponse::Metadata(Some(meta)) => {
                if meta.prefix.len() > SYNC_ID_LENGTH {
                    return Err("metadata prefix too long");
                }
                if meta.children.len() > limits::MAX_CHILDREN {
                    return Err("too many children");
                }
            }
            SyncResponse::SyncIds(ids) => {
                if ids.len() > limits::MAX_SYNC_IDS_PER_MESSAGE {
                    return Err("too many sync ids");
                }
            }
            SyncResponse::Metadata(None) | SyncResponse::Error { .. } => {}
        }
        Ok(())
    }

    /// Encode to CBOR.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    /// Decode from CBOR and check limits.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        let response: Self = decode(bytes)?;
        response
            .validate_limits()
            .map_err(|e| SyncError::InvalidMessage(e.to_string()))?;
        Ok(response)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| SyncError::Encoding(e.to_string()))?;
    if buf.len() > limits::MAX_MESSAGE_BYTES {
        return Err(SyncError::InvalidMessage(format!(
            "message of {} bytes exceeds limit",
            buf.len()
        )));
    }
    Ok(buf)
}

fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    if bytes.len() > limits::MAX_MESSAGE_BYTES {
        return Err(SyncError::InvalidMessage(format!(
            "message of {} bytes exceeds limit",
            bytes.len()
        )));
    }
    ciborium::from_reader(bytes).map_err(|e| SyncError::Encoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use synctrie_core::{ChildSummary, TrieHash, HASH_LENGTH};

    #[test]
    fn test_request_roundtrip() {
        let request = SyncRequest::GetMetadata {
            prefix: b"16651823".to_vec(),
        };
        let bytes = request.to_cbor().unwrap();
        assert_eq!(SyncRequest::from_cbor(&bytes).unwrap(), request);
    }

    #[test]
    fn test_response_roundtrip() {
        let mut children = BTreeMap::new();
        children.insert(
            b'3',
            ChildSummary {
                hash: TrieHash::digest(b"child"),
                item_count: 2,
            },
        );
        let response = SyncResponse::Metadata(Some(NodeMetadata {
            prefix: b"16651823".to_vec(),
            item_count: 2,
            hash: TrieHash::digest(b"node"),
            children,
        }));

        let bytes = response.to_cbor().unwrap();
        assert_eq!(SyncResponse::from_cbor(&bytes).unwrap(), response);
    }

    #[test]
    fn test_limits_enforced_on_decode() {
        let request = SyncRequest::GetSyncIds {
            prefix: vec![b'1'; limits::MAX_PREFIX_LEN + 1],
        };
        let bytes = request.to_cbor().unwrap();
        assert!(matches!(
            SyncRequest::from_cbor(&bytes),
            Err(SyncError::InvalidMessage(_))
        ));

        let id = SyncId::new(1665182332, &[0u8; HASH_LENGTH]).unwrap();
        let response = SyncResponse::SyncIds(vec![id; limits::MAX_SYNC_IDS_PER_MESSAGE + 1]);
        assert!(response.validate_limits().is_err());
    }

    proptest! {
        #[test]
        fn prop_decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = SyncRequest::from_cbor(&bytes);
            let _ = SyncResponse::from_cbor(&bytes);
        }
    }
}
