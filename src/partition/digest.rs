//! Content fingerprints of row sequences.
//!
//! Two sequences get the same digest only if they hold the same rows, with
//! the same column values, in the same order.

use crate::error::Result;
use crate::record::{Record, ShardRecord};
use xxhash_rust::xxh3::Xxh3;

/// Row count and xxh3 hash over the encoded rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShardDigest {
    pub rows: u64,
    pub hash: u64,
}

impl ShardDigest {
    /// Digests `rows` in iteration order.
    pub fn of<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut hasher = Xxh3::new();
        let mut count = 0u64;

        for record in rows {
            let encoded = match &record {
                Record::Postal(row) => row.encode()?,
                Record::Municipal(row) => row.encode()?,
            };
            // Length prefix keeps row boundaries part of the hash
            hasher.update(&(encoded.len() as u64).to_be_bytes());
            hasher.update(&encoded);
            count += 1;
        }

        Ok(Self {
            rows: count,
            hash: hasher.digest(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}
