//! Digest primitives for the trie.
//!
//! Every digest is BLAKE3 in extendable-output mode, truncated to
//! [`DIGEST_LENGTH`] bytes. Leaves hash the identifier bytes; internal nodes
//! hash the concatenation of their children's digests in ascending byte order.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::SyncId;

/// Length in bytes of every trie digest.
pub const DIGEST_LENGTH: usize = 20;

/// A 20-byte subtree digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TrieHash(pub [u8; DIGEST_LENGTH]);

impl TrieHash {
    /// Digest of a subtree that holds nothing.
    pub const EMPTY: Self = Self([0u8; DIGEST_LENGTH]);

    /// Hash a byte string.
    pub fn digest(data: &[u8]) -> Self {
        let mut hasher = TrieHasher::new();
        hasher.update_bytes(data);
        hasher.finalize()
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; DIGEST_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LENGTH] {
        &self.0
    }

    /// Whether this is the empty sentinel.
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != DIGEST_LENGTH {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; DIGEST_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for TrieHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "TrieHash(empty)")
        } else {
            write!(f, "TrieHash({})", &self.to_hex()[..12])
        }
    }
}

impl fmt::Display for TrieHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for TrieHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; DIGEST_LENGTH]> for TrieHash {
    fn from(bytes: [u8; DIGEST_LENGTH]) -> Self {
        Self(bytes)
    }
}

/// Incremental hasher that accepts several chunks before producing a digest.
#[derive(Clone, Default)]
pub struct TrieHasher {
    inner: blake3::Hasher,
}

impl TrieHasher {
    /// Create an empty hasher.
    pub fn new() -> Self {
        Self {
            inner: blake3::Hasher::new(),
        }
    }

    /// Feed a child digest.
    pub fn update(&mut self, hash: &TrieHash) -> &mut Self {
        self.inner.update(&hash.0);
        self
    }

    /// Feed raw bytes.
    pub fn update_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Produce the truncated digest.
    pub fn finalize(&self) -> TrieHash {
        let mut out = [0u8; DIGEST_LENGTH];
        self.inner.finalize_xof().fill(&mut out);
        TrieHash(out)
    }
}

/// Digest of a leaf holding `id`.
pub fn leaf_hash(id: &SyncId) -> TrieHash {
    TrieHash::digest(id.as_bytes())
}

/// Combine digests in the given order.
///
/// An empty input yields [`TrieHash::EMPTY`] rather than the hash of zero
/// bytes: a node without children and a level without siblings both
/// summarize nothing.
pub fn combine_hashes<'a, I>(hashes: I) -> TrieHash
where
    I: IntoIterator<Item = &'a TrieHash>,
{
    let mut hasher = TrieHasher::new();
    let mut any = false;
    for hash in hashes {
        hasher.update(hash);
        any = true;
    }

    if any {
        hasher.finalize()
    } else {
        TrieHash::EMPTY
    }
}
