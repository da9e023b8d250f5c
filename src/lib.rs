//! Per-country sharded postal code store.
//!
//! A unified GeoNames shard is split into one redb shard per country
//! ([`partition`]); the [`lookup::Controller`] answers place name to postal
//! code queries and back against the right shard, with Italy served from its
//! own municipal shard.

pub mod config;
pub mod countries;
pub mod error;
pub mod import;
pub mod index;
pub mod lookup;
pub mod partition;
pub mod record;
pub mod store;

// Re-export common types for convenience
pub use config::ShardConfig;
pub use error::{Error, Result, StoreError};
pub use lookup::Controller;
pub use partition::Partitioner;
pub use record::{MunicipalRecord, PostalRecord, Record};
pub use store::{ShardId, ShardStore};
