//! Configuration for shard storage.
//!
//! Tells the store where shard files live and how their file names are built.

use crate::error::{Error, Result};
use crate::store::ShardId;
use std::path::{Path, PathBuf};

/// Environment variable overriding the shard directory.
pub const DB_FOLDER_ENV: &str = "ZIPSHARDS_DB_FOLDER";

/// File extension shared by every shard file.
pub const SHARD_EXTENSION: &str = "redb";

/// Location and naming of shard files.
#[derive(Debug, Clone)]
pub struct ShardConfig {
    /// Directory holding every shard file
    pub db_folder: PathBuf,

    /// File name of the unified (all countries) shard
    pub unified_file: String,

    /// File name of the Italy shard
    pub italy_file: String,

    /// Prefix of per-country shard files, followed by the country code
    pub country_file_prefix: String,
}

impl ShardConfig {
    /// Creates a configuration rooted at `db_folder` with default file names.
    ///
    /// # Returns
    /// Validated configuration or error if the folder path is empty
    pub fn new(db_folder: impl Into<PathBuf>) -> Result<Self> {
        let db_folder = db_folder.into();
        if db_folder.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("db_folder must not be empty".to_string()));
        }

        Ok(Self {
            db_folder,
            ..Self::default()
        })
    }

    /// Creates a configuration from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(DB_FOLDER_ENV) {
            Some(folder) => Self::new(folder),
            None => Ok(Self::default()),
        }
    }

    pub fn builder() -> ShardConfigBuilder {
        ShardConfigBuilder::default()
    }

    pub fn db_folder(&self) -> &Path {
        &self.db_folder
    }

    /// Resolves a shard identifier to its file location.
    pub fn shard_path(&self, id: &ShardId) -> PathBuf {
        let file = match id {
            ShardId::Unified => self.unified_file.clone(),
            ShardId::Italy => self.italy_file.clone(),
            ShardId::Country(code) => {
                format!("{}{}.{}", self.country_file_prefix, code, SHARD_EXTENSION)
            }
        };
        self.db_folder.join(file)
    }
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            db_folder: PathBuf::from("./data"),
            unified_file: format!("zipcodes.{}", SHARD_EXTENSION),
            italy_file: format!("zipcodes_IT.{}", SHARD_EXTENSION),
            country_file_prefix: "zipcodes_".to_string(),
        }
    }
}

/// Builder for ShardConfig
#[derive(Default)]
pub struct ShardConfigBuilder {
    config: ShardConfig,
}

impl ShardConfigBuilder {
    pub fn db_folder(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.db_folder = path.into();
        self
    }

    pub fn unified_file(mut self, name: impl Into<String>) -> Self {
        self.config.unified_file = name.into();
        self
    }

    pub fn italy_file(mut self, name: impl Into<String>) -> Self {
        self.config.italy_file = name.into();
        self
    }

    pub fn country_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.country_file_prefix = prefix.into();
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<ShardConfig> {
        let config = self.config;
        if config.db_folder.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("db_folder must not be empty".to_string()));
        }
        if config.unified_file.is_empty() || config.italy_file.is_empty() {
            return Err(Error::InvalidConfig("shard file names must not be empty".to_string()));
        }
        if config.unified_file == config.italy_file {
            return Err(Error::InvalidConfig(
                "unified and Italy shards must use different files".to_string(),
            ));
        }
        Ok(config)
    }
}
