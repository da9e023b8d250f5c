//! Splitting the unified shard into per-country shards.

use super::digest::ShardDigest;
use crate::error::Result;
use crate::record::{Field, PostalRecord, Record};
use crate::store::{Predicate, ShardHandle, ShardId, ShardStore, ITALY};

/// One per-country shard written by a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryShard {
    pub code: String,
    pub rows: usize,
}

/// Outcome of a successful split.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitReport {
    /// Shards written, in country order
    pub written: Vec<CountryShard>,
    /// Countries without any row in the unified shard
    pub empty: Vec<String>,
}

impl SplitReport {
    pub fn total_rows(&self) -> usize {
        self.written.iter().map(|shard| shard.rows).sum()
    }
}

/// Outcome of comparing per-country shards against the unified shard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Countries whose shard matches the unified rows
    pub verified: Vec<String>,
    /// Countries with rows but no shard file
    pub missing: Vec<String>,
    /// Countries whose shard rows differ from the unified rows
    pub mismatched: Vec<String>,
    /// Countries without rows that nevertheless have a shard file
    pub unexpected: Vec<String>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.mismatched.is_empty() && self.unexpected.is_empty()
    }
}

/// Produces per-country shards from the unified shard.
///
/// Italy is never split: its shard uses the municipal layout and is built
/// separately.
pub struct Partitioner<'a> {
    store: &'a ShardStore,
}

impl<'a> Partitioner<'a> {
    pub fn new(store: &'a ShardStore) -> Self {
        Self { store }
    }

    /// Writes one shard per country of `countries` that has rows.
    ///
    /// Each country is committed on its own. The first storage error aborts
    /// the split; shards committed before it stay on disk. Target files must
    /// not already hold a postal table.
    pub fn split(&self, countries: &[(&str, &str)]) -> Result<SplitReport> {
        self.try_split(countries).map_err(|err| {
            tracing::error!(error = %err, "split failed");
            err
        })
    }

    fn try_split(&self, countries: &[(&str, &str)]) -> Result<SplitReport> {
        let unified = self.store.open(&ShardId::Unified)?;
        let mut report = SplitReport::default();

        for (code, name) in countries {
            if *code == ITALY {
                continue;
            }

            let rows = country_rows(&unified, code)?;
            if rows.is_empty() {
                tracing::debug!(country = *code, "no rows, shard skipped");
                report.empty.push(code.to_string());
                continue;
            }

            let shard = self.store.create(&ShardId::Country(code.to_string()))?;
            shard.create_schema()?;
            let written = shard.insert_batch(&rows)?;

            tracing::info!(country = *code, name = *name, rows = written, "country shard written");
            report.written.push(CountryShard {
                code: code.to_string(),
                rows: written,
            });
        }

        tracing::info!(
            shards = report.written.len(),
            rows = report.total_rows(),
            "split complete"
        );
        Ok(report)
    }

    /// Checks every per-country shard against the unified shard's rows.
    pub fn verify(&self, countries: &[(&str, &str)]) -> Result<VerifyReport> {
        self.try_verify(countries).map_err(|err| {
            tracing::error!(error = %err, "verification failed");
            err
        })
    }

    fn try_verify(&self, countries: &[(&str, &str)]) -> Result<VerifyReport> {
        let unified = self.store.open(&ShardId::Unified)?;
        let mut report = VerifyReport::default();

        for (code, _) in countries {
            if *code == ITALY {
                continue;
            }

            let id = ShardId::Country(code.to_string());
            let rows = country_rows(&unified, code)?;
            let expected = ShardDigest::of(rows.into_iter().map(Record::Postal))?;

            if expected.is_empty() {
                if self.store.exists(&id) {
                    report.unexpected.push(code.to_string());
                }
                continue;
            }
            if !self.store.exists(&id) {
                tracing::warn!(country = *code, "shard missing");
                report.missing.push(code.to_string());
                continue;
            }

            let actual = self.store.open(&id)?.digest()?;
            if actual == expected {
                report.verified.push(code.to_string());
            } else {
                tracing::warn!(
                    country = *code,
                    expected_rows = expected.rows,
                    actual_rows = actual.rows,
                    "shard differs from unified rows"
                );
                report.mismatched.push(code.to_string());
            }
        }

        Ok(report)
    }
}

/// Rows of the unified shard belonging to `code`, in storage order.
fn country_rows(unified: &ShardHandle, code: &str) -> Result<Vec<PostalRecord>> {
    let rows = unified
        .find_by_predicate(&Predicate::new().with(Field::CountryCode, code))?
        .filter_map(Record::into_postal)
        .collect();
    Ok(rows)
}
