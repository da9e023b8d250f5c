//! Exact-match predicates and query results.

use crate::error::StoreError;
use crate::record::{Field, FieldValue, Record, Schema};

/// Conjunction of `field = value` conditions.
///
/// An empty predicate matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    conditions: Vec<(Field, FieldValue)>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the condition `field = value`.
    pub fn with(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        self.conditions.push((field, value.into()));
        self
    }

    pub fn conditions(&self) -> &[(Field, FieldValue)] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Checks that every condition is applicable to `schema`.
    pub fn validate(&self, schema: Schema) -> Result<(), StoreError> {
        for (field, value) in &self.conditions {
            if field.schema() != schema {
                return Err(StoreError::FieldNotInSchema {
                    field: field.to_string(),
                    schema: schema.to_string(),
                });
            }

            let numeric_value = matches!(value, FieldValue::Int(_));
            if field.is_numeric() != numeric_value {
                return Err(StoreError::InvalidPredicate(format!(
                    "{} compared against {:?}",
                    field, value
                )));
            }
        }
        Ok(())
    }

    /// Whether `record` satisfies every condition.
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions
            .iter()
            .all(|(field, value)| record.field(*field).as_ref() == Some(value))
    }
}

/// Rows returned by a query, in storage order.
///
/// The rows are fully materialized before the read transaction ends; the
/// sequence can be consumed once.
#[derive(Debug)]
pub struct Rows {
    inner: std::vec::IntoIter<Record>,
}

impl Rows {
    pub(crate) fn new(records: Vec<Record>) -> Self {
        Self {
            inner: records.into_iter(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }
}

impl Iterator for Rows {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Rows {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{MunicipalRecord, PostalRecord};

    #[test]
    fn test_matches_all_conditions() {
        let record = Record::Postal(PostalRecord::new("US", 10001, "New York"));

        let predicate = Predicate::new()
            .with(Field::PlaceName, "New York")
            .with(Field::CountryCode, "US");
        assert!(predicate.matches(&record));

        let predicate = predicate.with(Field::PostalCode, 10002u32);
        assert!(!predicate.matches(&record));
    }

    #[test]
    fn test_matching_is_exact() {
        let record = Record::Postal(PostalRecord::new("US", 10001, "New York"));
        assert!(!Predicate::new().with(Field::PlaceName, "new york").matches(&record));
        assert!(!Predicate::new().with(Field::PlaceName, "New").matches(&record));
    }

    #[test]
    fn test_null_never_matches() {
        let record = Record::Municipal(MunicipalRecord::new(1, "Leggiuno", 21038));
        assert!(!Predicate::new().with(Field::Provincia, "VA").matches(&record));
    }

    #[test]
    fn test_validate_schema_and_types() {
        assert!(Predicate::new().with(Field::Comune, "Roma").validate(Schema::Municipal).is_ok());

        let foreign = Predicate::new().with(Field::Comune, "Roma").validate(Schema::Postal);
        assert!(matches!(foreign, Err(StoreError::FieldNotInSchema { .. })));

        let mistyped = Predicate::new().with(Field::Cap, "21038").validate(Schema::Municipal);
        assert!(matches!(mistyped, Err(StoreError::InvalidPredicate(_))));
    }

    #[test]
    fn test_empty_predicate_matches_everything() {
        let predicate = Predicate::new();
        assert!(predicate.is_empty());
        assert!(predicate.matches(&Record::Postal(PostalRecord::new("FR", 75001, "Paris"))));
    }
}
