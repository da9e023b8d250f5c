//! Bidirectional place name / postal code lookups.
//!
//! The [`Controller`] routes each query to the shard of its country. Italy is
//! served by the municipal shard opened at construction; every other country
//! shard is opened on its first query and kept for the controller's lifetime.

use crate::error::Result;
use crate::record::{Field, Record, Schema};
use crate::store::{Predicate, ShardHandle, ShardId, ShardStore};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Query-facing owner of opened shards.
///
/// Lookups never fail: storage errors are logged and reported as absence.
#[derive(Debug)]
pub struct Controller {
    store: ShardStore,
    italy: Option<ShardHandle>,
    shards: HashMap<String, ShardHandle>,
}

impl Controller {
    /// Creates a controller and opens the Italy shard.
    ///
    /// If the Italy shard cannot be opened the failure is logged and the
    /// open is retried on the next Italy query.
    pub fn new(store: ShardStore) -> Self {
        let italy = match store.open(&ShardId::Italy) {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::error!(error = %err, "Italy shard unavailable");
                None
            }
        };
        tracing::debug!(folder = %store.config().db_folder().display(), "controller created");

        Self {
            store,
            italy,
            shards: HashMap::new(),
        }
    }

    pub fn store(&self) -> &ShardStore {
        &self.store
    }

    /// Country codes whose shards are currently open, Italy excluded.
    pub fn open_shards(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.shards.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }

    pub fn italy_open(&self) -> bool {
        self.italy.is_some()
    }

    /// Postal code of `placename` in `countrycode`.
    ///
    /// With several matching rows the one stored first wins.
    pub fn zipcode_by_placename(&mut self, placename: &str, countrycode: &str) -> Option<u32> {
        self.try_zipcode_by_placename(placename, countrycode)
            .unwrap_or_else(|err| {
                tracing::error!(
                    country = countrycode,
                    placename,
                    error = %err,
                    "zipcode lookup failed"
                );
                None
            })
    }

    /// Names of the places in `countrycode` using `zipcode`, in storage order.
    pub fn placenames_by_zipcode(
        &mut self,
        countrycode: &str,
        zipcode: u32,
    ) -> Option<Vec<String>> {
        self.try_placenames_by_zipcode(countrycode, zipcode)
            .unwrap_or_else(|err| {
                tracing::error!(
                    country = countrycode,
                    zipcode,
                    error = %err,
                    "placename lookup failed"
                );
                None
            })
    }

    fn try_zipcode_by_placename(
        &mut self,
        placename: &str,
        countrycode: &str,
    ) -> Result<Option<u32>> {
        let shard = self.shard(countrycode)?;
        let zipcode = match shard.schema() {
            Schema::Municipal => shard
                .find_by_predicate(&Predicate::new().with(Field::Comune, placename))?
                .find_map(Record::into_municipal)
                .map(|row| row.cap),
            Schema::Postal => {
                let predicate = Predicate::new()
                    .with(Field::PlaceName, placename)
                    .with(Field::CountryCode, countrycode);
                shard
                    .find_by_predicate(&predicate)?
                    .find_map(Record::into_postal)
                    .map(|row| row.postalcode)
            }
        };
        Ok(zipcode)
    }

    fn try_placenames_by_zipcode(
        &mut self,
        countrycode: &str,
        zipcode: u32,
    ) -> Result<Option<Vec<String>>> {
        let shard = self.shard(countrycode)?;
        let names: Vec<String> = match shard.schema() {
            Schema::Municipal => shard
                .find_by_predicate(&Predicate::new().with(Field::Cap, zipcode))?
                .filter_map(Record::into_municipal)
                .map(|row| row.comune)
                .collect(),
            Schema::Postal => {
                let predicate = Predicate::new()
                    .with(Field::CountryCode, countrycode)
                    .with(Field::PostalCode, zipcode);
                shard
                    .find_by_predicate(&predicate)?
                    .filter_map(Record::into_postal)
                    .map(|row| row.placename)
                    .collect()
            }
        };

        Ok(if names.is_empty() { None } else { Some(names) })
    }

    /// Shard serving `countrycode`.
    fn shard(&mut self, countrycode: &str) -> Result<&ShardHandle> {
        match ShardId::for_country(countrycode) {
            ShardId::Italy => self.italy(),
            id => self.country(id),
        }
    }

    fn italy(&mut self) -> Result<&ShardHandle> {
        let handle = match self.italy.take() {
            Some(handle) => handle,
            None => self.store.open(&ShardId::Italy)?,
        };
        Ok(self.italy.insert(handle))
    }

    /// Country shard `id`, opened on first use.
    ///
    /// Failed opens are not remembered, so a shard created later is picked up.
    fn country(&mut self, id: ShardId) -> Result<&ShardHandle> {
        match self.shards.entry(id.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let handle = self.store.open(&id)?;
                Ok(entry.insert(handle))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShardConfig;
    use crate::record::{MunicipalRecord, PostalRecord};
    use tempfile::TempDir;

    fn store_with(dir: &TempDir) -> ShardStore {
        let store = ShardStore::new(ShardConfig::new(dir.path()).unwrap());

        let italy = store.create(&ShardId::Italy).unwrap();
        italy.create_schema().unwrap();
        italy
            .insert_batch(&[
                MunicipalRecord::new(12086, "Leggiuno", 21038),
                MunicipalRecord::new(12120, "Sangiano", 21038),
            ])
            .unwrap();

        let us = store.create(&ShardId::Country("US".to_string())).unwrap();
        us.create_schema().unwrap();
        us.insert_batch(&[
            PostalRecord::new("US", 10001, "New York"),
            PostalRecord::new("US", 10002, "New York"),
            PostalRecord::new("US", 10001, "Manhattan"),
        ])
        .unwrap();

        store
    }

    #[test]
    fn test_italy_opened_eagerly() {
        let dir = TempDir::new().unwrap();
        let controller = Controller::new(store_with(&dir));

        assert!(controller.italy_open());
        assert!(controller.open_shards().is_empty());
    }

    #[test]
    fn test_italy_lookups() {
        let dir = TempDir::new().unwrap();
        let mut controller = Controller::new(store_with(&dir));

        assert_eq!(controller.zipcode_by_placename("Leggiuno", "IT"), Some(21038));
        assert_eq!(
            controller.placenames_by_zipcode("IT", 21038),
            Some(vec!["Leggiuno".to_string(), "Sangiano".to_string()])
        );
        assert_eq!(controller.placenames_by_zipcode("IT", 99999), None);
        assert!(controller.open_shards().is_empty());
    }

    #[test]
    fn test_country_shard_opened_lazily() {
        let dir = TempDir::new().unwrap();
        let mut controller = Controller::new(store_with(&dir));

        assert_eq!(controller.zipcode_by_placename("New York", "US"), Some(10001));
        assert_eq!(controller.open_shards(), vec!["US"]);

        assert_eq!(
            controller.placenames_by_zipcode("US", 10001),
            Some(vec!["New York".to_string(), "Manhattan".to_string()])
        );
        assert_eq!(controller.open_shards(), vec!["US"]);
    }

    #[test]
    fn test_missing_shard_is_absent() {
        let dir = TempDir::new().unwrap();
        let mut controller = Controller::new(store_with(&dir));

        assert_eq!(controller.zipcode_by_placename("Berlin", "DE"), None);
        assert_eq!(controller.placenames_by_zipcode("DE", 10115), None);
        assert!(controller.open_shards().is_empty());
    }

    #[test]
    fn test_missing_italy_shard_retried() {
        let dir = TempDir::new().unwrap();
        let store = ShardStore::new(ShardConfig::new(dir.path()).unwrap());
        let mut controller = Controller::new(store);

        assert!(!controller.italy_open());
        assert_eq!(controller.zipcode_by_placename("Leggiuno", "IT"), None);

        {
            let italy = controller.store().create(&ShardId::Italy).unwrap();
            italy.insert_batch(&[MunicipalRecord::new(12086, "Leggiuno", 21038)]).unwrap();
        }

        assert_eq!(controller.zipcode_by_placename("Leggiuno", "IT"), Some(21038));
        assert!(controller.italy_open());
    }
}
