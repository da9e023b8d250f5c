//! Secondary indexes over shard tables.
//!
//! Every indexed field of a schema gets its own table named
//! `{table}#{column}` mapping a field value to the posting list of main-table
//! keys carrying it. Text fields use `&str` keys, integer fields `u64` keys.

use crate::error::Result;
use crate::record::{Field, FieldValue, Schema};
use redb::{ReadTransaction, TableDefinition, TableError, WriteTransaction};
use roaring::RoaringTreemap;
use std::collections::HashMap;

mod facade;
pub mod posting;

pub use posting::{PostingBytes, PostingList};

/// Read access to posting lists keyed by `K`.
pub trait PostingReadTable<K> {
    /// Returns the keys recorded under `key`, empty when absent.
    fn get_rows(&self, key: K) -> Result<RoaringTreemap>;
}

/// Write access to posting lists keyed by `K`.
pub trait PostingTable<K>: PostingReadTable<K> {
    /// Unions `rows` into the posting list stored under `key`.
    fn merge_rows(&mut self, key: K, rows: &RoaringTreemap) -> Result<()>;
}

/// Name of the index table for `field` of `schema`.
pub fn index_table_name(schema: Schema, field: Field) -> String {
    format!("{}#{}", schema.table_name(), field.column())
}

/// Looks up the posting list of `value` in the index of `field`.
///
/// A missing index table means no row was ever written, so the result is empty.
pub fn lookup(
    txn: &ReadTransaction,
    schema: Schema,
    field: Field,
    value: &FieldValue,
) -> Result<RoaringTreemap> {
    let name = index_table_name(schema, field);

    match value {
        FieldValue::Text(text) => {
            let definition: TableDefinition<&str, PostingList> = TableDefinition::new(&name);
            match txn.open_table(definition) {
                Ok(table) => table.get_rows(text.as_str()),
                Err(TableError::TableDoesNotExist(_)) => Ok(RoaringTreemap::new()),
                Err(err) => Err(err.into()),
            }
        }
        FieldValue::Int(number) => {
            let definition: TableDefinition<u64, PostingList> = TableDefinition::new(&name);
            match txn.open_table(definition) {
                Ok(table) => table.get_rows(*number),
                Err(TableError::TableDoesNotExist(_)) => Ok(RoaringTreemap::new()),
                Err(err) => Err(err.into()),
            }
        }
    }
}

/// Accumulates postings for a batch and writes them once per index key.
#[derive(Debug)]
pub struct PostingBuilder {
    schema: Schema,
    postings: HashMap<Field, HashMap<FieldValue, RoaringTreemap>>,
}

impl PostingBuilder {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            postings: HashMap::new(),
        }
    }

    /// Records that main-table key `row` carries `value` in `field`.
    pub fn add(&mut self, field: Field, value: FieldValue, row: u64) {
        self.postings
            .entry(field)
            .or_default()
            .entry(value)
            .or_default()
            .insert(row);
    }

    /// Number of distinct (field, value) terms collected so far.
    pub fn term_count(&self) -> usize {
        self.postings.values().map(HashMap::len).sum()
    }

    /// Merges the collected postings into the index tables of `txn`.
    pub fn flush(self, txn: &WriteTransaction) -> Result<()> {
        for (field, terms) in self.postings {
            let name = index_table_name(self.schema, field);

            if field.is_numeric() {
                let definition: TableDefinition<u64, PostingList> = TableDefinition::new(&name);
                let mut table = txn.open_table(definition)?;
                for (value, rows) in terms {
                    if let FieldValue::Int(number) = value {
                        table.merge_rows(number, &rows)?;
                    }
                }
            } else {
                let definition: TableDefinition<&str, PostingList> = TableDefinition::new(&name);
                let mut table = txn.open_table(definition)?;
                for (value, rows) in terms {
                    if let FieldValue::Text(text) = value {
                        table.merge_rows(text.as_str(), &rows)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redb::{Database, ReadableDatabase};
    use tempfile::NamedTempFile;

    #[test]
    fn test_index_table_name() {
        assert_eq!(
            index_table_name(Schema::Postal, Field::PlaceName),
            "geonames-postal-code#placename"
        );
        assert_eq!(index_table_name(Schema::Municipal, Field::Cap), "listacomuni#CAP");
    }

    #[test]
    fn test_flush_and_lookup() {
        let temp_file = NamedTempFile::new().unwrap();
        let db = Database::create(temp_file.path()).unwrap();

        let mut builder = PostingBuilder::new(Schema::Postal);
        builder.add(Field::PlaceName, FieldValue::from("Paris"), 0);
        builder.add(Field::PlaceName, FieldValue::from("Paris"), 3);
        builder.add(Field::PostalCode, FieldValue::from(75001u32), 0);
        assert_eq!(builder.term_count(), 2);

        let write_txn = db.begin_write().unwrap();
        builder.flush(&write_txn).unwrap();
        write_txn.commit().unwrap();

        // A second batch merges into the existing lists
        let mut builder = PostingBuilder::new(Schema::Postal);
        builder.add(Field::PlaceName, FieldValue::from("Paris"), 9);
        let write_txn = db.begin_write().unwrap();
        builder.flush(&write_txn).unwrap();
        write_txn.commit().unwrap();

        let read_txn = db.begin_read().unwrap();
        let rows = lookup(&read_txn, Schema::Postal, Field::PlaceName, &"Paris".into()).unwrap();
        assert_eq!(rows.iter().collect::<Vec<_>>(), vec![0, 3, 9]);

        let rows = lookup(&read_txn, Schema::Postal, Field::PostalCode, &75001u32.into()).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_corrupt_posting_list_is_reported() {
        let temp_file = NamedTempFile::new().unwrap();
        let db = Database::create(temp_file.path()).unwrap();
        let name = index_table_name(Schema::Postal, Field::PlaceName);

        let write_txn = db.begin_write().unwrap();
        {
            let definition: TableDefinition<&str, PostingList> = TableDefinition::new(&name);
            let mut table = write_txn.open_table(definition).unwrap();
            table.insert("Paris", PostingBytes::new(&[1, 7, 7])).unwrap();
        }
        write_txn.commit().unwrap();

        // Merging into the damaged entry must fail, not overwrite it
        let mut builder = PostingBuilder::new(Schema::Postal);
        builder.add(Field::PlaceName, FieldValue::from("Paris"), 4);
        let write_txn = db.begin_write().unwrap();
        let result = builder.flush(&write_txn);
        assert!(matches!(
            result,
            Err(crate::Error::Store(crate::StoreError::CorruptRecord(_)))
        ));
        write_txn.abort().unwrap();

        let read_txn = db.begin_read().unwrap();
        let result = lookup(&read_txn, Schema::Postal, Field::PlaceName, &"Paris".into());
        assert!(matches!(
            result,
            Err(crate::Error::Store(crate::StoreError::CorruptRecord(_)))
        ));
    }

    #[test]
    fn test_lookup_missing_index_is_empty() {
        let temp_file = NamedTempFile::new().unwrap();
        let db = Database::create(temp_file.path()).unwrap();

        let read_txn = db.begin_read().unwrap();
        let rows = lookup(&read_txn, Schema::Municipal, Field::Comune, &"Roma".into()).unwrap();
        assert!(rows.is_empty());
    }
}
