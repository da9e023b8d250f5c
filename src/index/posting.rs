//! Posting list value type for secondary index tables.
//!
//! A posting list is the set of main-table keys whose row carries a given
//! field value, kept as a RoaringTreemap. Index tables hand out the stored
//! bytes as [`PostingBytes`]; decoding happens on demand so a corrupt entry
//! surfaces as an error instead of an empty list.

use crate::error::{Result, StoreError};
use redb::Value as RedbValue;
use roaring::RoaringTreemap;

/// Current encoding version for posting lists
pub const POSTING_VERSION: u8 = 1;

/// Sorted set of main-table keys stored as an index value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PostingList {
    rows: RoaringTreemap,
}

impl PostingList {
    pub fn into_rows(self) -> RoaringTreemap {
        self.rows
    }

    /// Encodes the posting list into storage format.
    ///
    /// # Returns
    /// A version byte followed by the portable roaring serialization
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(1 + self.rows.serialized_size());
        buf.push(POSTING_VERSION);
        self.rows
            .serialize_into(&mut buf)
            .map_err(|e| StoreError::Encoding(e.to_string()))?;
        Ok(buf)
    }

    /// Decodes storage bytes into a posting list.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let (version, body) = data
            .split_first()
            .ok_or_else(|| StoreError::CorruptRecord("empty posting list".to_string()))?;

        if *version != POSTING_VERSION {
            return Err(StoreError::CorruptRecord(format!(
                "unsupported posting list version: {}",
                version
            ))
            .into());
        }

        let rows = RoaringTreemap::deserialize_from(body)
            .map_err(|e| StoreError::CorruptRecord(format!("posting list: {}", e)))?;
        Ok(Self { rows })
    }
}

impl From<RoaringTreemap> for PostingList {
    fn from(rows: RoaringTreemap) -> Self {
        Self { rows }
    }
}

/// Encoded posting list as read from or written to an index table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingBytes<'a>(&'a [u8]);

impl<'a> PostingBytes<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self(data)
    }

    pub fn decode(&self) -> Result<PostingList> {
        PostingList::decode(self.0)
    }
}

impl RedbValue for PostingList {
    type SelfType<'a>
        = PostingBytes<'a>
    where
        Self: 'a;
    type AsBytes<'a>
        = &'a [u8]
    where
        Self: 'a;

    fn fixed_width() -> Option<usize> {
        None
    }

    fn from_bytes<'a>(data: &'a [u8]) -> Self::SelfType<'a>
    where
        Self: 'a,
    {
        PostingBytes(data)
    }

    fn as_bytes<'a, 'b: 'a>(value: &'a Self::SelfType<'b>) -> Self::AsBytes<'a>
    where
        Self: 'b,
    {
        value.0
    }

    fn type_name() -> redb::TypeName {
        redb::TypeName::new("zipshards::PostingList")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let mut rows = RoaringTreemap::new();
        rows.insert(0);
        rows.insert(41);
        rows.insert(1 << 40);
        let list = PostingList::from(rows);

        let encoded = list.encode().unwrap();
        assert_eq!(encoded[0], POSTING_VERSION);
        assert_eq!(PostingBytes::new(&encoded).decode().unwrap(), list);
    }

    #[test]
    fn test_invalid_version() {
        let mut invalid = vec![42];
        invalid.extend_from_slice(b"garbage");
        assert!(PostingList::decode(&invalid).is_err());
        assert!(PostingList::decode(&[]).is_err());
    }

    #[test]
    fn test_unreadable_bytes_are_corrupt() {
        let result = <PostingList as RedbValue>::from_bytes(&[1, 7, 7]).decode();
        assert!(matches!(
            result,
            Err(crate::Error::Store(StoreError::CorruptRecord(_)))
        ));
    }
}
