//! Merge stage: combine partition files into the final dataset.

use crate::checkpoint::{read_records, write_records};
use crate::{Result, ScrapedListingRecord};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    /// Drop records whose address, sale date and sale price repeat an
    /// earlier record.
    pub dedup: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self { dedup: true }
    }
}

#[derive(Debug, Default)]
pub struct MergeOutcome {
    pub records: Vec<ScrapedListingRecord>,
    /// Record count per input file, in input order.
    pub per_source: Vec<(PathBuf, usize)>,
    pub missing: Vec<PathBuf>,
    pub unreadable: Vec<(PathBuf, String)>,
    pub duplicates_removed: usize,
}

impl MergeOutcome {
    pub fn write_to(&self, path: &Path) -> Result<()> {
        write_records(path, &self.records)?;
        info!("Wrote {} merged records to {}", self.records.len(), path.display());
        Ok(())
    }
}

/// Read every partition file, concatenate in the given order, then sort by
/// sale date (newest first) and optionally drop duplicates.
///
/// Missing or unreadable files contribute nothing and are reported in the
/// outcome; they never abort the merge.
pub fn merge_partitions(paths: &[PathBuf], options: MergeOptions) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for path in paths {
        match read_records(path) {
            Ok(Some(records)) => {
                outcome.per_source.push((path.clone(), records.len()));
                outcome.records.extend(records);
            }
            Ok(None) => {
                warn!("Partition file {} is missing, treating it as empty", path.display());
                outcome.per_source.push((path.clone(), 0));
                outcome.missing.push(path.clone());
            }
            Err(e) => {
                warn!("Partition file {} is unreadable ({}), treating it as empty", path.display(), e);
                outcome.per_source.push((path.clone(), 0));
                outcome.unreadable.push((path.clone(), e.to_string()));
            }
        }
    }

    sort_newest_first(&mut outcome.records);
    if options.dedup {
        outcome.duplicates_removed = dedup_in_place(&mut outcome.records);
        if outcome.duplicates_removed > 0 {
            info!("Dropped {} duplicate records", outcome.duplicates_removed);
        }
    }

    outcome
}

/// Stable sort by `sold_date` descending; equal dates keep input order.
pub fn sort_newest_first(records: &mut [ScrapedListingRecord]) {
    records.sort_by(|a, b| b.sold_date.cmp(&a.sold_date));
}

/// Keep the first record for each dedup key. Returns how many were dropped.
pub fn dedup_in_place(records: &mut Vec<ScrapedListingRecord>) -> usize {
    let before = records.len();
    let mut seen = HashSet::new();
    records.retain(|record| seen.insert(record.dedup_key()));
    before - records.len()
}
