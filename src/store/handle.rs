//! An opened shard file.

use super::predicate::{Predicate, Rows};
use super::ShardId;
use crate::error::{Result, StoreError};
use crate::index::{self, PostingBuilder};
use crate::partition::ShardDigest;
use crate::record::{FieldValue, MunicipalRecord, PostalRecord, Record, Schema, ShardRecord};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition, TableError,
};
use roaring::RoaringTreemap;
use std::path::{Path, PathBuf};

/// Main table of `schema`: primary key to encoded row.
fn main_table(schema: Schema) -> TableDefinition<'static, u64, &'static [u8]> {
    TableDefinition::new(schema.table_name())
}

fn decode_record(schema: Schema, data: &[u8]) -> Result<Record> {
    let record = match schema {
        Schema::Postal => PostalRecord::decode(data)?.into_record(),
        Schema::Municipal => MunicipalRecord::decode(data)?.into_record(),
    };
    Ok(record)
}

/// Handle to one shard database.
///
/// Each call runs in its own transaction; read transactions end before the
/// call returns, on success and on error.
pub struct ShardHandle {
    id: ShardId,
    path: PathBuf,
    db: Database,
}

impl std::fmt::Debug for ShardHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardHandle")
            .field("id", &self.id)
            .field("path", &self.path)
            .finish()
    }
}

impl ShardHandle {
    pub(crate) fn new(id: ShardId, path: PathBuf, db: Database) -> Self {
        Self { id, path, db }
    }

    pub fn id(&self) -> &ShardId {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> Schema {
        self.id.schema()
    }

    /// Whether the shard already carries its main table.
    pub fn has_schema(&self) -> Result<bool> {
        let txn = self.db.begin_read()?;
        match txn.open_table(main_table(self.schema())) {
            Ok(_) => Ok(true),
            Err(TableError::TableDoesNotExist(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Creates the main table of the shard's schema.
    ///
    /// Fails with [`StoreError::SchemaExists`] if the table is already present.
    pub fn create_schema(&self) -> Result<()> {
        let schema = self.schema();
        if self.has_schema()? {
            return Err(StoreError::SchemaExists(schema.table_name().to_string()).into());
        }

        let txn = self.db.begin_write()?;
        {
            txn.open_table(main_table(schema))?;
        }
        txn.commit()?;

        tracing::debug!(shard = %self.id, table = schema.table_name(), "schema created");
        Ok(())
    }

    /// Appends `records` and their index postings in one committed transaction.
    ///
    /// Nothing is written if any row fails; a reused natural key fails with
    /// [`StoreError::DuplicateKey`].
    ///
    /// # Returns
    /// Number of rows written
    pub fn insert_batch<R: ShardRecord>(&self, records: &[R]) -> Result<usize> {
        let schema = self.schema();
        if R::SCHEMA != schema {
            return Err(StoreError::SchemaMismatch {
                expected: schema.to_string(),
                found: R::SCHEMA.to_string(),
            }
            .into());
        }

        let txn = self.db.begin_write()?;
        let mut postings = PostingBuilder::new(schema);
        {
            let mut table = txn.open_table(main_table(schema))?;
            let mut next_row = match table.last()? {
                Some((key, _)) => key.value() + 1,
                None => 0,
            };

            for record in records {
                let key = record.primary_key(next_row);
                let bytes = record.encode()?;
                if table.insert(key, bytes.as_slice())?.is_some() {
                    return Err(StoreError::DuplicateKey(key).into());
                }
                next_row = next_row.max(key + 1);

                for field in schema.indexed_fields() {
                    if let Some(value) = record.field(*field) {
                        postings.add(*field, value, key);
                    }
                }
            }
        }
        postings.flush(&txn)?;
        txn.commit()?;

        tracing::debug!(shard = %self.id, rows = records.len(), "batch committed");
        Ok(records.len())
    }

    /// Returns every row satisfying `predicate`, in ascending primary key order.
    pub fn find_by_predicate(&self, predicate: &Predicate) -> Result<Rows> {
        let schema = self.schema();
        predicate.validate(schema)?;

        let txn = self.db.begin_read()?;
        let table = txn.open_table(main_table(schema))?;

        let mut records = Vec::new();
        match self.candidates(&txn, predicate)? {
            Some(keys) => {
                for key in keys.iter() {
                    if let Some(guard) = table.get(key)? {
                        let record = decode_record(schema, guard.value())?;
                        if predicate.matches(&record) {
                            records.push(record);
                        }
                    }
                }
            }
            None => {
                for entry in table.iter()? {
                    let (_, value) = entry?;
                    let record = decode_record(schema, value.value())?;
                    if predicate.matches(&record) {
                        records.push(record);
                    }
                }
            }
        }

        Ok(Rows::new(records))
    }

    /// Narrows the keys to visit using the primary key and the indexes.
    ///
    /// `None` means no condition is indexed and the whole table must be scanned.
    fn candidates(
        &self,
        txn: &redb::ReadTransaction,
        predicate: &Predicate,
    ) -> Result<Option<RoaringTreemap>> {
        let schema = self.schema();
        let mut candidates: Option<RoaringTreemap> = None;

        for (field, value) in predicate.conditions() {
            let keys = if schema.primary_key() == Some(*field) {
                let mut keys = RoaringTreemap::new();
                if let FieldValue::Int(key) = value {
                    keys.insert(*key);
                }
                keys
            } else if schema.indexed_fields().contains(field) {
                index::lookup(txn, schema, *field, value)?
            } else {
                continue;
            };

            let narrowed = match candidates {
                Some(current) => current & keys,
                None => keys,
            };
            if narrowed.is_empty() {
                return Ok(Some(narrowed));
            }
            candidates = Some(narrowed);
        }

        Ok(candidates)
    }

    /// Number of rows in the main table.
    pub fn len(&self) -> Result<u64> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(main_table(self.schema()))?;
        Ok(table.len()?)
    }

    /// Fingerprint of every row, in storage order.
    pub fn digest(&self) -> Result<ShardDigest> {
        ShardDigest::of(self.find_by_predicate(&Predicate::new())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Field;
    use tempfile::TempDir;

    fn open_shard(dir: &TempDir, id: ShardId) -> ShardHandle {
        let path = dir.path().join(format!("{}.redb", id));
        let db = Database::create(&path).unwrap();
        ShardHandle::new(id, path, db)
    }

    fn postal_rows() -> Vec<PostalRecord> {
        vec![
            PostalRecord::new("US", 10001, "New York"),
            PostalRecord::new("US", 90210, "Beverly Hills"),
            PostalRecord::new("US", 10001, "Manhattan"),
            PostalRecord::new("FR", 10001, "Troyes"),
        ]
    }

    #[test]
    fn test_create_schema_twice_fails() {
        let dir = TempDir::new().unwrap();
        let shard = open_shard(&dir, ShardId::Unified);

        assert!(!shard.has_schema().unwrap());
        shard.create_schema().unwrap();
        assert!(shard.has_schema().unwrap());

        let result = shard.create_schema();
        assert!(matches!(
            result,
            Err(crate::Error::Store(StoreError::SchemaExists(_)))
        ));
    }

    #[test]
    fn test_insert_and_find() {
        let dir = TempDir::new().unwrap();
        let shard = open_shard(&dir, ShardId::Unified);
        shard.create_schema().unwrap();

        assert_eq!(shard.insert_batch(&postal_rows()).unwrap(), 4);
        assert_eq!(shard.len().unwrap(), 4);

        let rows: Vec<_> = shard
            .find_by_predicate(&Predicate::new().with(Field::PostalCode, 10001u32))
            .unwrap()
            .filter_map(Record::into_postal)
            .map(|r| r.placename)
            .collect();
        assert_eq!(rows, vec!["New York", "Manhattan", "Troyes"]);

        let rows = shard
            .find_by_predicate(
                &Predicate::new()
                    .with(Field::PostalCode, 10001u32)
                    .with(Field::CountryCode, "FR"),
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_unindexed_condition_scans() {
        let dir = TempDir::new().unwrap();
        let shard = open_shard(&dir, ShardId::Unified);

        let mut record = PostalRecord::new("US", 10001, "New York");
        record.adminname1 = Some("New York".to_string());
        shard.insert_batch(&[record, PostalRecord::new("US", 90210, "Beverly Hills")]).unwrap();

        let rows = shard
            .find_by_predicate(&Predicate::new().with(Field::AdminName1, "New York"))
            .unwrap();
        assert_eq!(rows.len(), 1);

        let all = shard.find_by_predicate(&Predicate::new()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(shard.digest().unwrap().rows, 2);
    }

    #[test]
    fn test_rows_keep_insertion_order_across_batches() {
        let dir = TempDir::new().unwrap();
        let shard = open_shard(&dir, ShardId::Unified);

        shard.insert_batch(&[PostalRecord::new("US", 1, "Springfield")]).unwrap();
        shard.insert_batch(&[PostalRecord::new("US", 2, "Springfield")]).unwrap();

        let zips: Vec<u32> = shard
            .find_by_predicate(&Predicate::new().with(Field::PlaceName, "Springfield"))
            .unwrap()
            .filter_map(Record::into_postal)
            .map(|r| r.postalcode)
            .collect();
        assert_eq!(zips, vec![1, 2]);
    }

    #[test]
    fn test_municipal_primary_key_lookup() {
        let dir = TempDir::new().unwrap();
        let shard = open_shard(&dir, ShardId::Italy);
        shard
            .insert_batch(&[
                MunicipalRecord::new(12086, "Leggiuno", 21038),
                MunicipalRecord::new(12087, "Sangiano", 21038),
            ])
            .unwrap();

        let rows: Vec<_> = shard
            .find_by_predicate(&Predicate::new().with(Field::Istat, 12087u32))
            .unwrap()
            .collect();
        assert_eq!(rows.len(), 1);

        let rows = shard
            .find_by_predicate(&Predicate::new().with(Field::Cap, 21038u32))
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_duplicate_istat_rolls_back_batch() {
        let dir = TempDir::new().unwrap();
        let shard = open_shard(&dir, ShardId::Italy);
        shard.insert_batch(&[MunicipalRecord::new(1, "Roma", 118)]).unwrap();

        let result = shard.insert_batch(&[
            MunicipalRecord::new(2, "Milano", 20121),
            MunicipalRecord::new(1, "Roma", 118),
        ]);
        assert!(matches!(
            result,
            Err(crate::Error::Store(StoreError::DuplicateKey(1)))
        ));
        assert_eq!(shard.len().unwrap(), 1);
    }

    #[test]
    fn test_schema_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let shard = open_shard(&dir, ShardId::Italy);

        let result = shard.insert_batch(&[PostalRecord::new("IT", 21038, "Leggiuno")]);
        assert!(matches!(
            result,
            Err(crate::Error::Store(StoreError::SchemaMismatch { .. }))
        ));
    }

    #[test]
    fn test_query_without_schema_fails() {
        let dir = TempDir::new().unwrap();
        let shard = open_shard(&dir, ShardId::Country("DE".to_string()));

        let result = shard.find_by_predicate(&Predicate::new().with(Field::PlaceName, "Berlin"));
        assert!(result.is_err());
    }
}
