//! Persisted form of a trie node.
//!
//! A record is a CBOR map with small integer keys, written in key order:
//!
//! | key | field      | type                                  |
//! |-----|------------|---------------------------------------|
//! | 0   | digest     | bytes(20)                             |
//! | 1   | item count | uint                                  |
//! | 2   | key        | bytes(30), leaf records only          |
//! | 3   | children   | array of `[byte, bytes(20), uint]`    |
//!
//! Children carry their digest and item count so a node can be rebuilt
//! without reading its grandchildren.

use ciborium::value::Value;
use std::collections::BTreeMap;

use crate::error::{CoreError, Result};
use crate::hash::{combine_hashes, leaf_hash, TrieHash, DIGEST_LENGTH};
use crate::metadata::ChildSummary;
use crate::types::{SyncId, SYNC_ID_LENGTH};

/// Record field keys.
mod keys {
    pub const HASH: u64 = 0;
    pub const ITEM_COUNT: u64 = 1;
    pub const KEY: u64 = 2;
    pub const CHILDREN: u64 = 3;
}

/// One persisted trie node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeRecord {
    pub hash: TrieHash,
    pub item_count: u64,
    /// The stored identifier; only present at leaf depth.
    pub key: Option<SyncId>,
    pub children: BTreeMap<u8, ChildSummary>,
}

impl NodeRecord {
    /// A leaf holding `id`.
    pub fn leaf(id: SyncId) -> Self {
        Self {
            hash: leaf_hash(&id),
            item_count: 1,
            key: Some(id),
            children: BTreeMap::new(),
        }
    }

    /// An internal node whose digest and count derive from `children`.
    pub fn from_children(children: BTreeMap<u8, ChildSummary>) -> Self {
        Self {
            hash: combine_hashes(children.values().map(|c| &c.hash)),
            item_count: children.values().map(|c| c.item_count).sum(),
            key: None,
            children,
        }
    }

    /// Whether this record stores an identifier.
    pub fn is_leaf(&self) -> bool {
        self.key.is_some()
    }

    /// Whether this record holds nothing at all.
    pub fn is_empty(&self) -> bool {
        self.key.is_none() && self.children.is_empty()
    }

    /// Summary as seen from the parent.
    pub fn summary(&self) -> ChildSummary {
        ChildSummary {
            hash: self.hash,
            item_count: self.item_count,
        }
    }

    /// Encode to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut entries = Vec::with_capacity(4);

        entries.push((
            Value::Integer(keys::HASH.into()),
            Value::Bytes(self.hash.0.to_vec()),
        ));
        entries.push((
            Value::Integer(keys::ITEM_COUNT.into()),
            Value::Integer(self.item_count.into()),
        ));
        if let Some(key) = &self.key {
            entries.push((
                Value::Integer(keys::KEY.into()),
                Value::Bytes(key.0.to_vec()),
            ));
        }

        let children = self
            .children
            .iter()
            .map(|(byte, child)| {
                Value::Array(vec![
                    Value::Integer((*byte).into()),
                    Value::Bytes(child.hash.0.to_vec()),
                    Value::Integer(child.item_count.into()),
                ])
            })
            .collect();
        entries.push((Value::Integer(keys::CHILDREN.into()), Value::Array(children)));

        let mut buf = Vec::new();
        ciborium::into_writer(&Value::Map(entries), &mut buf)
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(buf)
    }

    /// Decode from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value: Value = ciborium::from_reader(bytes).map_err(|e| malformed(e.to_string()))?;

        let map = match value {
            Value::Map(m) => m,
            _ => return Err(malformed("expected map")),
        };

        let hash = match field(&map, keys::HASH) {
            Some(v) => digest(v, "digest")?,
            None => return Err(malformed("missing digest")),
        };

        let item_count = match field(&map, keys::ITEM_COUNT) {
            Some(v) => uint(v, "item count")?,
            None => return Err(malformed("missing item count")),
        };

        let key = match field(&map, keys::KEY) {
            Some(Value::Bytes(b)) => Some(
                SyncId::try_from(b.as_slice()).map_err(|e| malformed(e.to_string()))?,
            ),
            Some(Value::Null) | None => None,
            Some(_) => return Err(malformed("key is not a byte string")),
        };

        let mut children = BTreeMap::new();
        match field(&map, keys::CHILDREN) {
            Some(Value::Array(entries)) => {
                for entry in entries {
                    let (byte, summary) = child_entry(entry)?;
                    if children.insert(byte, summary).is_some() {
                        return Err(malformed(format!("duplicate child {byte}")));
                    }
                }
            }
            None => {}
            Some(_) => return Err(malformed("children is not an array")),
        }

        Ok(Self {
            hash,
            item_count,
            key,
            children,
        })
    }

    /// Check that a record loaded at `depth` has the shape a node at that
    /// depth must have.
    ///
    /// Digests of children are not recomputed here; only the node's own
    /// count, and for leaves the digest of the stored key.
    pub fn check_shape(&self, depth: usize) -> Result<()> {
        if depth > SYNC_ID_LENGTH {
            return Err(malformed(format!("record at depth {depth} is below leaf depth")));
        }

        if depth == SYNC_ID_LENGTH {
            let key = self
                .key
                .as_ref()
                .ok_or_else(|| malformed("leaf record without key"))?;
            if !self.children.is_empty() {
                return Err(malformed("leaf record with children"));
            }
            if self.item_count != 1 {
                return Err(malformed(format!("leaf record counts {} items", self.item_count)));
            }
            if self.hash != leaf_hash(key) {
                return Err(malformed("leaf digest does not match key"));
            }
            return Ok(());
        }

        if self.key.is_some() {
            return Err(malformed(format!("internal record at depth {depth} has a key")));
        }
        if self.children.is_empty() {
            return Err(malformed(format!("internal record at depth {depth} has no children")));
        }
        let sum: u64 = self.children.values().map(|c| c.item_count).sum();
        if sum != self.item_count {
            return Err(malformed(format!(
                "item count {} does not match children total {}",
                self.item_count, sum
            )));
        }
        Ok(())
    }
}

fn malformed(msg: impl Into<String>) -> CoreError {
    CoreError::MalformedRecord(msg.into())
}

fn field(map: &[(Value, Value)], key: u64) -> Option<&Value> {
    map.iter()
        .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == i128::from(key)))
        .map(|(_, v)| v)
}

fn uint(value: &Value, what: &str) -> Result<u64> {
    match value {
        Value::Integer(i) => {
            u64::try_from(*i).map_err(|_| malformed(format!("{what} out of range")))
        }
        _ => Err(malformed(format!("{what} is not an integer"))),
    }
}

fn digest(value: &Value, what: &str) -> Result<TrieHash> {
    match value {
        Value::Bytes(b) if b.len() == DIGEST_LENGTH => {
            let mut arr = [0u8; DIGEST_LENGTH];
            arr.copy_from_slice(b);
            Ok(TrieHash(arr))
        }
        _ => Err(malformed(format!("invalid {what}"))),
    }
}

fn child_entry(value: &Value) -> Result<(u8, ChildSummary)> {
    let parts = match value {
        Value::Array(parts) if parts.len() == 3 => parts,
        _ => return Err(malformed("child entry is not a 3-element array")),
    };

    let byte = match &parts[0] {
        Value::Integer(i) => {
            u8::try_from(*i).map_err(|_| malformed("child byte out of range"))?
        }
        _ => return Err(malformed("child byte is not an integer")),
    };

    Ok((
        byte,
        ChildSummary {
            hash: digest(&parts[1], "child digest")?,
            item_count: uint(&parts[2], "child item count")?,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use crate::types::HASH_LENGTH;

    fn id(ts: u64, fill: u8) -> SyncId {
        SyncId::new(ts, &[fill; HASH_LENGTH]).unwrap()
    }

    #[test]
    fn test_leaf_roundtrip() {
        let record = NodeRecord::leaf(id(1665182332, 7));
        let decoded = NodeRecord::from_bytes(&record.to_bytes().unwrap()).unwrap();
        assert_eq!(record, decoded);
        assert!(decoded.is_leaf());
        decoded.check_shape(SYNC_ID_LENGTH).unwrap();
    }

    #[test]
    fn test_internal_roundtrip() {
        let a = NodeRecord::leaf(id(1665182332, 1));
        let b = NodeRecord::leaf(id(1665182332, 2));
        let mut children = BTreeMap::new();
        children.insert(1u8, a.summary());
        children.insert(2u8, b.summary());

        let record = NodeRecord::from_children(children);
        assert_eq!(record.item_count, 2);
        assert_eq!(record.hash, combine_hashes([&a.hash, &b.hash]));

        let decoded = NodeRecord::from_bytes(&record.to_bytes().unwrap()).unwrap();
        assert_eq!(record, decoded);
        decoded.check_shape(SYNC_ID_LENGTH - 1).unwrap();
    }

    #[test]
    fn test_encoding_deterministic() {
        let record = NodeRecord::leaf(id(1665182343, 9));
        assert_eq!(record.to_bytes().unwrap(), record.to_bytes().unwrap());
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = NodeRecord::from_bytes(&[0xff, 0x00, 0x13]).unwrap_err();
        assert!(matches!(err, CoreError::MalformedRecord(_)));
    }

    #[test]
    fn test_short_digest_is_malformed() {
        let value = Value::Map(vec![
            (Value::Integer(0.into()), Value::Bytes(vec![1, 2, 3])),
            (Value::Integer(1.into()), Value::Integer(1.into())),
        ]);
        let mut buf = Vec::new();
        ciborium::into_writer(&value, &mut buf).unwrap();

        assert!(matches!(
            NodeRecord::from_bytes(&buf),
            Err(CoreError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_missing_count_is_malformed() {
        let value = Value::Map(vec![(
            Value::Integer(0.into()),
            Value::Bytes(vec![0u8; DIGEST_LENGTH]),
        )]);
        let mut buf = Vec::new();
        ciborium::into_writer(&value, &mut buf).unwrap();

        assert!(NodeRecord::from_bytes(&buf).is_err());
    }

    #[test]
    fn test_shape_checks() {
        let leaf = NodeRecord::leaf(id(1665182332, 3));
        assert!(leaf.check_shape(5).is_err());
        assert!(NodeRecord::default().check_shape(3).is_err());

        let mut children = BTreeMap::new();
        children.insert(b'3', leaf.summary());
        let mut internal = NodeRecord::from_children(children);
        internal.check_shape(4).unwrap();

        internal.item_count = 5;
        assert!(internal.check_shape(4).is_err());
    }

    proptest! {
        #[test]
        fn prop_decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..128)) {
            if let Ok(record) = NodeRecord::from_bytes(&bytes) {
                let _ = record.check_shape(SYNC_ID_LENGTH);
            }
        }
    }
}
