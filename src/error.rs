//! Crate-scoped error handling for zipshards.
//!
//! This module provides a unified error type for public APIs while keeping
//! the storage layer's own error type precise enough for diagnostics.

use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type exposed to users of the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Errors from the shard storage layer
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Errors while reading delimited source data
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration values
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors specific to the shard storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("table: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("commit: {0}")]
    Commit(#[from] redb::CommitError),

    /// The shard file does not exist
    #[error("shard file {0} not found")]
    ShardMissing(String),

    /// The shard already carries the table that would be created
    #[error("table {0} already exists in shard")]
    SchemaExists(String),

    /// A condition names a column the queried schema does not have
    #[error("field {field} is not part of the {schema} schema")]
    FieldNotInSchema { field: String, schema: String },

    /// A condition compares a field against a value of the wrong type
    #[error("invalid predicate: {0}")]
    InvalidPredicate(String),

    /// Rows of one layout were written to a shard of the other
    #[error("schema mismatch: shard holds {expected} rows, got {found}")]
    SchemaMismatch { expected: String, found: String },

    /// A row reuses the natural primary key of an existing row
    #[error("duplicate primary key {0}")]
    DuplicateKey(u64),

    /// A shard identifier that cannot name a shard file
    #[error("invalid shard identifier {0:?}")]
    InvalidShardId(String),

    /// A stored row or posting list could not be decoded
    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    /// A row could not be encoded for storage
    #[error("record encoding failed: {0}")]
    Encoding(String),
}

impl From<redb::DatabaseError> for Error {
    fn from(err: redb::DatabaseError) -> Self {
        Error::Store(err.into())
    }
}

impl From<redb::TransactionError> for Error {
    fn from(err: redb::TransactionError) -> Self {
        Error::Store(err.into())
    }
}

impl From<redb::TableError> for Error {
    fn from(err: redb::TableError) -> Self {
        Error::Store(err.into())
    }
}

impl From<redb::StorageError> for Error {
    fn from(err: redb::StorageError) -> Self {
        Error::Store(err.into())
    }
}

impl From<redb::CommitError> for Error {
    fn from(err: redb::CommitError) -> Self {
        Error::Store(err.into())
    }
}

/// Malformed line in a delimited source file.
#[derive(Debug, Error)]
#[error("line {line}: {reason}")]
pub struct ImportError {
    pub line: usize,
    pub reason: String,
}

impl ImportError {
    pub fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}
