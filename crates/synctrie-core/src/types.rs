//! Strong type definitions for trie identifiers.
//!
//! A [`SyncId`] is the only key the trie understands. Its layout is fixed:
//! ten ASCII decimal digits of the timestamp (seconds, zero padded) followed
//! by the 20-byte content hash of the item.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Number of leading identifier bytes derived from the timestamp.
pub const TIMESTAMP_LENGTH: usize = 10;

/// Number of trailing identifier bytes taken from the content hash.
pub const HASH_LENGTH: usize = 20;

/// Total identifier length, and therefore the depth of every trie leaf.
pub const SYNC_ID_LENGTH: usize = TIMESTAMP_LENGTH + HASH_LENGTH;

/// Largest timestamp that renders in [`TIMESTAMP_LENGTH`] digits.
pub const MAX_TIMESTAMP: u64 = 9_999_999_999;

/// A fixed-length identifier for one stored item.
///
/// Byte order is trie order: identifiers compare lexicographically, so the
/// timestamp prefix sorts items chronologically.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SyncId(pub [u8; SYNC_ID_LENGTH]);

impl SyncId {
    /// Build an identifier from a timestamp (seconds) and a content hash.
    pub fn new(timestamp: u64, hash: &[u8]) -> Result<Self> {
        if hash.len() != HASH_LENGTH {
            return Err(CoreError::InvalidLength {
                what: "hash",
                expected: HASH_LENGTH,
                got: hash.len(),
            });
        }

        let mut bytes = [0u8; SYNC_ID_LENGTH];
        bytes[..TIMESTAMP_LENGTH].copy_from_slice(&timestamp_prefix(timestamp)?);
        bytes[TIMESTAMP_LENGTH..].copy_from_slice(hash);
        Ok(Self(bytes))
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; SYNC_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; SYNC_ID_LENGTH] {
        &self.0
    }

    /// The timestamp-derived prefix.
    pub fn timestamp_bytes(&self) -> &[u8] {
        &self.0[..TIMESTAMP_LENGTH]
    }

    /// The content-hash suffix.
    pub fn hash_bytes(&self) -> &[u8] {
        &self.0[TIMESTAMP_LENGTH..]
    }

    /// Parse the timestamp prefix back into seconds.
    ///
    /// Returns `None` if the prefix is not all ASCII digits, which can happen
    /// for identifiers built with [`SyncId::from_bytes`].
    pub fn timestamp(&self) -> Option<u64> {
        self.timestamp_bytes().iter().try_fold(0u64, |acc, b| {
            b.is_ascii_digit().then(|| acc * 10 + u64::from(b - b'0'))
        })
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Render a timestamp as the identifier prefix it produces.
pub fn timestamp_prefix(timestamp: u64) -> Result<[u8; TIMESTAMP_LENGTH]> {
    if timestamp > MAX_TIMESTAMP {
        return Err(CoreError::TimestampOutOfRange(timestamp));
    }

    let digits = format!("{:0width$}", timestamp, width = TIMESTAMP_LENGTH);
    let mut prefix = [0u8; TIMESTAMP_LENGTH];
    prefix.copy_from_slice(digits.as_bytes());
    Ok(prefix)
}

impl fmt::Debug for SyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SyncId({}:{})",
            String::from_utf8_lossy(self.timestamp_bytes()),
            &hex::encode(self.hash_bytes())[..8]
        )
    }
}

impl fmt::Display for SyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for SyncId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; SYNC_ID_LENGTH]> for SyncId {
    fn from(bytes: [u8; SYNC_ID_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for SyncId {
    type Error = CoreError;

    fn try_from(slice: &[u8]) -> Result<Self> {
        let arr: [u8; SYNC_ID_LENGTH] =
            slice.try_into().map_err(|_| CoreError::InvalidLength {
                what: "sync id",
                expected: SYNC_ID_LENGTH,
                got: slice.len(),
            })?;
        Ok(Self(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sync_id_layout() {
        let id = SyncId::new(1665182332, &[0xab; HASH_LENGTH]).unwrap();
        assert_eq!(id.timestamp_bytes(), b"1665182332");
        assert_eq!(id.hash_bytes(), &[0xab; HASH_LENGTH]);
        assert_eq!(id.timestamp(), Some(1665182332));
    }

    #[test]
    fn test_timestamp_is_zero_padded() {
        let id = SyncId::new(42, &[0u8; HASH_LENGTH]).unwrap();
        assert_eq!(id.timestamp_bytes(), b"0000000042");
    }

    #[test]
    fn test_rejects_bad_inputs() {
        assert!(matches!(
            SyncId::new(MAX_TIMESTAMP + 1, &[0u8; HASH_LENGTH]),
            Err(CoreError::TimestampOutOfRange(_))
        ));
        assert!(matches!(
            SyncId::new(1, &[0u8; 19]),
            Err(CoreError::InvalidLength { got: 19, .. })
        ));
        assert!(SyncId::try_from(&[0u8; 29][..]).is_err());
    }

    #[test]
    fn test_ordering_follows_timestamp() {
        let early = SyncId::new(1665182332, &[0xff; HASH_LENGTH]).unwrap();
        let late = SyncId::new(1665182343, &[0x00; HASH_LENGTH]).unwrap();
        assert!(early < late);
    }

    #[test]
    fn test_raw_bytes_without_digits() {
        let id = SyncId::from_bytes([0xff; SYNC_ID_LENGTH]);
        assert_eq!(id.timestamp(), None);
    }

    proptest! {
        #[test]
        fn prop_timestamp_roundtrip(ts in 0u64..=MAX_TIMESTAMP, hash in any::<[u8; HASH_LENGTH]>()) {
            let id = SyncId::new(ts, &hash).unwrap();
            prop_assert_eq!(id.timestamp(), Some(ts));
            prop_assert_eq!(id.timestamp_bytes(), &timestamp_prefix(ts).unwrap()[..]);
            prop_assert_eq!(id.hash_bytes(), &hash[..]);
        }

        #[test]
        fn prop_order_follows_timestamp(a in 0u64..=MAX_TIMESTAMP, b in 0u64..=MAX_TIMESTAMP) {
            let x = SyncId::new(a, &[0xff; HASH_LENGTH]).unwrap();
            let y = SyncId::new(b, &[0x00; HASH_LENGTH]).unwrap();
            if a < b {
                prop_assert!(x < y);
            }
        }
    }
}
