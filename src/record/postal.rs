//! Generic Postal Record (GeoNames layout).

use super::{
    decode_versioned, encode_versioned, text, Field, FieldValue, Record, Schema, ShardRecord,
};
use crate::error::StoreError;
use std::fmt;

/// Row tuple in fixed column order:
/// `(postalcode, countrycode, placename, adminname1, admincode1, adminname2,
/// admincode2, adminname3, admincode3, latitude, longitude, accuracy, coordinates)`.
pub type PostalTuple = (
    u32,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<f64>,
    Option<f64>,
    Option<u32>,
    Option<String>,
);

/// One postal code / place name pair with its administrative hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct PostalRecord {
    pub countrycode: String,
    pub postalcode: u32,
    pub placename: String,
    pub adminname1: Option<String>,
    pub admincode1: Option<String>,
    pub adminname2: Option<String>,
    pub admincode2: Option<String>,
    pub adminname3: Option<String>,
    pub admincode3: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<u32>,
    pub coordinates: Option<String>,
}

impl PostalRecord {
    /// Creates a record with every optional column empty.
    pub fn new(
        countrycode: impl Into<String>,
        postalcode: u32,
        placename: impl Into<String>,
    ) -> Self {
        Self {
            countrycode: countrycode.into(),
            postalcode,
            placename: placename.into(),
            adminname1: None,
            admincode1: None,
            adminname2: None,
            admincode2: None,
            adminname3: None,
            admincode3: None,
            latitude: None,
            longitude: None,
            accuracy: None,
            coordinates: None,
        }
    }

    /// Returns the row as a tuple in fixed column order.
    pub fn to_tuple(&self) -> PostalTuple {
        (
            self.postalcode,
            self.countrycode.clone(),
            self.placename.clone(),
            self.adminname1.clone(),
            self.admincode1.clone(),
            self.adminname2.clone(),
            self.admincode2.clone(),
            self.adminname3.clone(),
            self.admincode3.clone(),
            self.latitude,
            self.longitude,
            self.accuracy,
            self.coordinates.clone(),
        )
    }

    pub fn from_tuple(tuple: PostalTuple) -> Self {
        let (
            postalcode,
            countrycode,
            placename,
            adminname1,
            admincode1,
            adminname2,
            admincode2,
            adminname3,
            admincode3,
            latitude,
            longitude,
            accuracy,
            coordinates,
        ) = tuple;

        Self {
            countrycode,
            postalcode,
            placename,
            adminname1,
            admincode1,
            adminname2,
            admincode2,
            adminname3,
            admincode3,
            latitude,
            longitude,
            accuracy,
            coordinates,
        }
    }
}

impl ShardRecord for PostalRecord {
    const SCHEMA: Schema = Schema::Postal;

    fn encode(&self) -> Result<Vec<u8>, StoreError> {
        encode_versioned(&self.to_tuple())
    }

    fn decode(data: &[u8]) -> Result<Self, StoreError> {
        decode_versioned::<PostalTuple>(data).map(Self::from_tuple)
    }

    fn primary_key(&self, next_row: u64) -> u64 {
        next_row
    }

    fn field(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::CountryCode => Some(FieldValue::Text(self.countrycode.clone())),
            Field::PostalCode => Some(FieldValue::from(self.postalcode)),
            Field::PlaceName => Some(FieldValue::Text(self.placename.clone())),
            Field::AdminName1 => text(&self.adminname1),
            Field::AdminCode1 => text(&self.admincode1),
            Field::AdminName2 => text(&self.adminname2),
            Field::AdminCode2 => text(&self.admincode2),
            Field::AdminName3 => text(&self.adminname3),
            Field::AdminCode3 => text(&self.admincode3),
            Field::Accuracy => self.accuracy.map(FieldValue::from),
            Field::Coordinates => text(&self.coordinates),
            _ => None,
        }
    }

    fn into_record(self) -> Record {
        Record::Postal(self)
    }
}

impl fmt::Display for PostalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<ZipCode(zip='{}', countrycode='{}', placename='{}')>",
            self.postalcode, self.countrycode, self.placename
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PostalRecord {
        let mut record = PostalRecord::new("US", 10001, "New York");
        record.adminname1 = Some("New York".to_string());
        record.admincode1 = Some("NY".to_string());
        record.latitude = Some(40.7484);
        record.longitude = Some(-73.9967);
        record.accuracy = Some(4);
        record
    }

    #[test]
    fn test_tuple_column_order() {
        let tuple = sample().to_tuple();
        assert_eq!(tuple.0, 10001);
        assert_eq!(tuple.1, "US");
        assert_eq!(tuple.2, "New York");
        assert_eq!(tuple.4.as_deref(), Some("NY"));
        assert_eq!(tuple.11, Some(4));
        assert_eq!(PostalRecord::from_tuple(tuple), sample());
    }

    #[test]
    fn test_encoded_row_carries_version_byte() {
        let record = sample();
        let encoded = record.encode().unwrap();

        assert_eq!(encoded[0], crate::record::RECORD_VERSION);
        assert_eq!(PostalRecord::decode(&encoded).unwrap(), record);
    }

    #[test]
    fn test_truncated_row_is_corrupt() {
        let encoded = sample().encode().unwrap();
        let result = PostalRecord::decode(&encoded[..encoded.len() / 2]);
        assert!(matches!(result, Err(StoreError::CorruptRecord(_))));
    }

    #[test]
    fn test_field_access() {
        let record = sample();
        assert_eq!(record.field(Field::PostalCode), Some(FieldValue::Int(10001)));
        assert_eq!(record.field(Field::AdminName3), None);
        assert_eq!(record.field(Field::Comune), None);
        assert_eq!(record.primary_key(7), 7);
    }
}
