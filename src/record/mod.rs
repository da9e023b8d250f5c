//! Row schemas stored in shards.
//!
//! Two independent flat schemas exist: the generic GeoNames postal layout used
//! by the unified shard and every per-country shard, and the Italian municipal
//! layout used only by the Italy shard.

use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

pub mod municipal;
pub mod postal;

pub use municipal::MunicipalRecord;
pub use postal::{PostalRecord, PostalTuple};

/// Current encoding version for stored rows
pub const RECORD_VERSION: u8 = 1;

/// The two table layouts a shard can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schema {
    /// Generic Postal Record layout
    Postal,
    /// Italy Municipal Record layout
    Municipal,
}

impl Schema {
    /// Name of the main table holding the rows.
    pub fn table_name(&self) -> &'static str {
        match self {
            Schema::Postal => "geonames-postal-code",
            Schema::Municipal => "listacomuni",
        }
    }

    /// Fields backed by a posting-list index.
    pub fn indexed_fields(&self) -> &'static [Field] {
        match self {
            Schema::Postal => &[Field::CountryCode, Field::PlaceName, Field::PostalCode],
            Schema::Municipal => &[Field::Comune, Field::Cap],
        }
    }

    /// Field stored as the main table key, if the schema has a natural one.
    pub fn primary_key(&self) -> Option<Field> {
        match self {
            Schema::Postal => None,
            Schema::Municipal => Some(Field::Istat),
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Exact-match queryable columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    CountryCode,
    PostalCode,
    PlaceName,
    AdminName1,
    AdminCode1,
    AdminName2,
    AdminCode2,
    AdminName3,
    AdminCode3,
    Accuracy,
    Coordinates,
    Istat,
    Comune,
    Provincia,
    Regione,
    Prefisso,
    Cap,
    CodFisco,
    Abitanti,
    Link,
}

impl Field {
    pub fn schema(&self) -> Schema {
        match self {
            Field::CountryCode
            | Field::PostalCode
            | Field::PlaceName
            | Field::AdminName1
            | Field::AdminCode1
            | Field::AdminName2
            | Field::AdminCode2
            | Field::AdminName3
            | Field::AdminCode3
            | Field::Accuracy
            | Field::Coordinates => Schema::Postal,
            _ => Schema::Municipal,
        }
    }

    /// Column name as it appears in the source tables.
    pub fn column(&self) -> &'static str {
        match self {
            Field::CountryCode => "countrycode",
            Field::PostalCode => "postalcode",
            Field::PlaceName => "placename",
            Field::AdminName1 => "adminname1",
            Field::AdminCode1 => "admincode1",
            Field::AdminName2 => "adminname2",
            Field::AdminCode2 => "admincode2",
            Field::AdminName3 => "adminname3",
            Field::AdminCode3 => "admincode3",
            Field::Accuracy => "accuracy",
            Field::Coordinates => "coordinates",
            Field::Istat => "Istat",
            Field::Comune => "Comune",
            Field::Provincia => "Provincia",
            Field::Regione => "Regione",
            Field::Prefisso => "Prefisso",
            Field::Cap => "CAP",
            Field::CodFisco => "CodFisco",
            Field::Abitanti => "Abitanti",
            Field::Link => "Link",
        }
    }

    /// Whether values of this field are integers.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Field::PostalCode
                | Field::Accuracy
                | Field::Istat
                | Field::Prefisso
                | Field::Cap
                | Field::Abitanti
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A single column value used in predicates and index terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    Text(String),
    Int(u64),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Int(u64::from(value))
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Int(value)
    }
}

/// A row read back from any shard.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Postal(PostalRecord),
    Municipal(MunicipalRecord),
}

impl Record {
    pub fn schema(&self) -> Schema {
        match self {
            Record::Postal(_) => Schema::Postal,
            Record::Municipal(_) => Schema::Municipal,
        }
    }

    pub fn field(&self, field: Field) -> Option<FieldValue> {
        match self {
            Record::Postal(record) => record.field(field),
            Record::Municipal(record) => record.field(field),
        }
    }

    pub fn into_postal(self) -> Option<PostalRecord> {
        match self {
            Record::Postal(record) => Some(record),
            Record::Municipal(_) => None,
        }
    }

    pub fn into_municipal(self) -> Option<MunicipalRecord> {
        match self {
            Record::Municipal(record) => Some(record),
            Record::Postal(_) => None,
        }
    }
}

/// Row types that can be written to and read from a shard.
pub trait ShardRecord: Sized {
    /// Layout this row belongs to.
    const SCHEMA: Schema;

    fn encode(&self) -> Result<Vec<u8>, StoreError>;

    fn decode(data: &[u8]) -> Result<Self, StoreError>;

    /// Main table key for this row.
    ///
    /// `next_row` is the next free surrogate key of the target table; layouts
    /// with a natural key ignore it.
    fn primary_key(&self, next_row: u64) -> u64;

    /// Value of `field` in this row, `None` for nulls and foreign fields.
    fn field(&self, field: Field) -> Option<FieldValue>;

    fn into_record(self) -> Record;
}

/// Encodes a serializable row body behind a version byte.
pub(crate) fn encode_versioned<T: Serialize>(body: &T) -> Result<Vec<u8>, StoreError> {
    let encoded = bincode::serialize(body).map_err(|e| StoreError::Encoding(e.to_string()))?;

    let mut buf = Vec::with_capacity(1 + encoded.len());
    buf.push(RECORD_VERSION);
    buf.extend_from_slice(&encoded);
    Ok(buf)
}

/// Decodes a row body written by [`encode_versioned`].
pub(crate) fn decode_versioned<T: DeserializeOwned>(data: &[u8]) -> Result<T, StoreError> {
    let (version, body) = data
        .split_first()
        .ok_or_else(|| StoreError::CorruptRecord("empty row".to_string()))?;

    if *version != RECORD_VERSION {
        return Err(StoreError::CorruptRecord(format!(
            "unsupported row version: {}",
            version
        )));
    }

    bincode::deserialize(body).map_err(|e| StoreError::CorruptRecord(e.to_string()))
}

/// Wraps an optional text column.
pub(crate) fn text(value: &Option<String>) -> Option<FieldValue> {
    value.as_ref().map(|v| FieldValue::Text(v.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_belong_to_their_schema() {
        for field in Schema::Postal.indexed_fields() {
            assert_eq!(field.schema(), Schema::Postal);
        }
        for field in Schema::Municipal.indexed_fields() {
            assert_eq!(field.schema(), Schema::Municipal);
        }
        assert_eq!(Schema::Municipal.primary_key(), Some(Field::Istat));
        assert_eq!(Schema::Postal.primary_key(), None);
    }

    #[test]
    fn test_table_names() {
        assert_eq!(Schema::Postal.table_name(), "geonames-postal-code");
        assert_eq!(Schema::Municipal.table_name(), "listacomuni");
    }

    #[test]
    fn test_invalid_version() {
        let mut invalid = vec![99];
        invalid.extend_from_slice(b"fake_data");

        let result: Result<u32, StoreError> = decode_versioned(&invalid);
        assert!(matches!(result, Err(StoreError::CorruptRecord(_))));

        let result: Result<u32, StoreError> = decode_versioned(&[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_record_variants() {
        let record = Record::Municipal(MunicipalRecord::new(12086, "Leggiuno", 21038));
        assert_eq!(record.schema(), Schema::Municipal);
        assert_eq!(record.field(Field::Cap), Some(FieldValue::Int(21038)));
        assert!(record.clone().into_postal().is_none());
        assert!(record.into_municipal().is_some());
    }
}
