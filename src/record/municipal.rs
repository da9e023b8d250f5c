//! Italy Municipal Record (listacomuni layout).

use super::{
    decode_versioned, encode_versioned, text, Field, FieldValue, Record, Schema, ShardRecord,
};
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One Italian municipality keyed by its ISTAT code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MunicipalRecord {
    pub istat: u32,
    pub comune: String,
    pub provincia: Option<String>,
    pub regione: Option<String>,
    pub prefisso: Option<u32>,
    pub cap: u32,
    pub cod_fisco: Option<String>,
    pub abitanti: Option<u64>,
    pub link: Option<String>,
}

impl MunicipalRecord {
    /// Creates a record with every optional column empty.
    pub fn new(istat: u32, comune: impl Into<String>, cap: u32) -> Self {
        Self {
            istat,
            comune: comune.into(),
            provincia: None,
            regione: None,
            prefisso: None,
            cap,
            cod_fisco: None,
            abitanti: None,
            link: None,
        }
    }
}

impl ShardRecord for MunicipalRecord {
    const SCHEMA: Schema = Schema::Municipal;

    fn encode(&self) -> Result<Vec<u8>, StoreError> {
        encode_versioned(self)
    }

    fn decode(data: &[u8]) -> Result<Self, StoreError> {
        decode_versioned(data)
    }

    fn primary_key(&self, _next_row: u64) -> u64 {
        u64::from(self.istat)
    }

    fn field(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::Istat => Some(FieldValue::from(self.istat)),
            Field::Comune => Some(FieldValue::Text(self.comune.clone())),
            Field::Provincia => text(&self.provincia),
            Field::Regione => text(&self.regione),
            Field::Prefisso => self.prefisso.map(FieldValue::from),
            Field::Cap => Some(FieldValue::from(self.cap)),
            Field::CodFisco => text(&self.cod_fisco),
            Field::Abitanti => self.abitanti.map(FieldValue::from),
            Field::Link => text(&self.link),
            _ => None,
        }
    }

    fn into_record(self) -> Record {
        Record::Municipal(self)
    }
}

impl fmt::Display for MunicipalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<ZipCodeIT(zip='{}', placename='{}')>", self.cap, self.comune)
    }
}
