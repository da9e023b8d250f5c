//! File-backed shard storage.
//!
//! Every shard is an independent redb database file holding one main table
//! (see [`Schema`]) plus its posting-list indexes. [`ShardStore`] maps shard
//! identifiers to files and opens them; [`ShardHandle`] reads and writes rows.

use crate::config::ShardConfig;
use crate::error::{Result, StoreError};
use crate::record::Schema;
use redb::Database;
use std::fmt;
use std::path::PathBuf;

pub mod handle;
pub mod predicate;

pub use handle::ShardHandle;
pub use predicate::{Predicate, Rows};

/// Country code served by the dedicated Italy shard.
pub const ITALY: &str = "IT";

/// Identifies one shard file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShardId {
    /// All countries before partitioning
    Unified,
    /// Italian municipalities
    Italy,
    /// One country's postal codes
    Country(String),
}

impl ShardId {
    /// Shard serving `code`; Italy gets its dedicated shard.
    pub fn for_country(code: &str) -> Self {
        if code == ITALY {
            ShardId::Italy
        } else {
            ShardId::Country(code.to_string())
        }
    }

    pub fn schema(&self) -> Schema {
        match self {
            ShardId::Italy => Schema::Municipal,
            ShardId::Unified | ShardId::Country(_) => Schema::Postal,
        }
    }

    /// Rejects country codes that cannot be embedded in a file name.
    pub fn validate(&self) -> std::result::Result<(), StoreError> {
        if let ShardId::Country(code) = self {
            if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(StoreError::InvalidShardId(code.clone()));
            }
        }
        Ok(())
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardId::Unified => f.write_str("unified"),
            ShardId::Italy => f.write_str(ITALY),
            ShardId::Country(code) => f.write_str(code),
        }
    }
}

/// Resolves shard identifiers to files under the configured folder.
#[derive(Debug, Clone)]
pub struct ShardStore {
    config: ShardConfig,
}

impl ShardStore {
    pub fn new(config: ShardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ShardConfig {
        &self.config
    }

    pub fn path(&self, id: &ShardId) -> PathBuf {
        self.config.shard_path(id)
    }

    pub fn exists(&self, id: &ShardId) -> bool {
        self.path(id).is_file()
    }

    /// Opens an existing shard file.
    pub fn open(&self, id: &ShardId) -> Result<ShardHandle> {
        id.validate()?;
        let path = self.path(id);
        if !path.is_file() {
            return Err(StoreError::ShardMissing(path.display().to_string()).into());
        }

        let db = Database::open(&path)?;
        tracing::debug!(shard = %id, path = %path.display(), "shard opened");
        Ok(ShardHandle::new(id.clone(), path, db))
    }

    /// Opens a shard file, creating it and the shard folder when missing.
    pub fn create(&self, id: &ShardId) -> Result<ShardHandle> {
        id.validate()?;
        std::fs::create_dir_all(self.config.db_folder())?;

        let path = self.path(id);
        let db = Database::create(&path)?;
        tracing::debug!(shard = %id, path = %path.display(), "shard created");
        Ok(ShardHandle::new(id.clone(), path, db))
    }
}
