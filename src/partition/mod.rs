//! Country partitioning of the unified shard.
//!
//! The unified shard is split offline, once per source data refresh, into one
//! shard per country so lookups only touch a single country's rows.

pub mod digest;
pub mod splitter;

// Re-export main types for public API
pub use digest::ShardDigest;
pub use splitter::{CountryShard, Partitioner, SplitReport, VerifyReport};
