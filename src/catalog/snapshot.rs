use crate::core::{FundRecord, RawFundRow};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Validated records from one catalog fetch, in source order. Never mutated
/// after construction.
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    records: Vec<FundRecord>,
    malformed: usize,
    duplicates: usize,
}

impl CatalogSnapshot {
    /// Parses source rows, skipping malformed ones and repeated codes (the
    /// first occurrence wins).
    pub fn ingest(rows: Vec<RawFundRow>) -> Self {
        let mut records = Vec::with_capacity(rows.len());
        let mut seen = HashSet::with_capacity(rows.len());
        let mut malformed = 0;
        let mut duplicates = 0;

        for (position, row) in rows.into_iter().enumerate() {
            match FundRecord::try_from(row) {
                Ok(record) => {
                    if seen.insert(record.code.clone()) {
                        records.push(record);
                    } else {
                        debug!(position, code = %record.code, "Skipping duplicate fund code");
                        duplicates += 1;
                    }
                }
                Err(reason) => {
                    debug!(position, %reason, "Skipping malformed catalog row");
                    malformed += 1;
                }
            }
        }

        if malformed > 0 || duplicates > 0 {
            warn!(
                malformed,
                duplicates,
                kept = records.len(),
                "Catalog contained unusable rows"
            );
        }

        CatalogSnapshot {
            records,
            malformed,
            duplicates,
        }
    }

    pub fn records(&self) -> &[FundRecord] {
        &self.records
    }

    pub fn get(&self, slot: usize) -> Option<&FundRecord> {
        self.records.get(slot)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows dropped during ingestion, malformed and duplicate alike.
    pub fn skipped(&self) -> usize {
        self.malformed + self.duplicates
    }

    pub fn malformed(&self) -> usize {
        self.malformed
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}
