//! Partition checkpoint files.
//!
//! A checkpoint is the whole set of records a worker has accepted so far,
//! stored as one pretty-printed JSON array. Every save replaces the file
//! atomically, so readers only ever see a complete array.

use crate::{Result, ScrapedListingRecord};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Checkpoint {
    path: PathBuf,
    records: Vec<ScrapedListingRecord>,
}

impl Checkpoint {
    /// Load the checkpoint at `path`; a missing file is an empty checkpoint.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = read_records(&path)?.unwrap_or_default();
        debug!("Loaded {} records from {}", records.len(), path.display());
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[ScrapedListingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Highest page number any stored record was scraped from.
    pub fn last_completed_page(&self) -> Option<u32> {
        self.records.iter().map(ScrapedListingRecord::page_number).max()
    }

    /// Next page to fetch for a partition covering `[start_page, end_page]`.
    /// A value of `end_page + 1` means the partition is already complete.
    pub fn resume_page(&self, start_page: u32, end_page: u32) -> u32 {
        match self.last_completed_page() {
            Some(last) => last.saturating_add(1).min(end_page.saturating_add(1)).max(start_page),
            None => start_page,
        }
    }

    /// Add one page worth of records and rewrite the file.
    pub fn append_page(&mut self, records: Vec<ScrapedListingRecord>) -> Result<()> {
        self.records.extend(records);
        write_records(&self.path, &self.records)
    }

    pub fn into_records(self) -> Vec<ScrapedListingRecord> {
        self.records
    }
}

/// Read a record array, returning `None` when the file does not exist.
pub fn read_records(path: &Path) -> Result<Option<Vec<ScrapedListingRecord>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let records = serde_json::from_reader(BufReader::new(file))?;
    Ok(Some(records))
}

/// Replace `path` with a pretty-printed array of `records`.
///
/// The array is written to a temporary file in the same directory and
/// renamed over the target.
pub fn write_records(path: &Path, records: &[ScrapedListingRecord]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, records)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::record;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty_checkpoint() {
        let dir = tempdir().unwrap();
        let checkpoint = Checkpoint::load(dir.path().join("partition_1.json")).unwrap();
        assert!(checkpoint.is_empty());
        assert_eq!(checkpoint.last_completed_page(), None);
        assert_eq!(checkpoint.resume_page(5, 10), 5);
    }

    #[test]
    fn test_append_rewrites_whole_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("partition_2.json");
        let mut checkpoint = Checkpoint::load(&path).unwrap();

        checkpoint
            .append_page(vec![record((2024, 2, 1), "1 Quay Street, Galway", "https://example.com/sold/page-5")])
            .unwrap();
        checkpoint
            .append_page(vec![
                record((2024, 1, 9), "2 Quay Street, Galway", "https://example.com/sold/page-6"),
                record((2024, 1, 8), "3 Quay Street, Galway", "https://example.com/sold/page-6"),
            ])
            .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let parsed: Vec<ScrapedListingRecord> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.len(), 3);
        assert!(text.starts_with("[\n"));

        let reloaded = Checkpoint::load(&path).unwrap();
        assert_eq!(reloaded.records(), checkpoint.records());
        assert_eq!(reloaded.last_completed_page(), Some(6));
    }

    #[test]
    fn test_resume_page_bounds() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partition_1.json");
        write_records(
            &path,
            &[
                record((2024, 2, 1), "1 Quay Street, Galway", "https://example.com/sold/page-7"),
                record((2024, 2, 1), "9 Quay Street, Galway", "https://example.com/sold/page-6"),
            ],
        )
        .unwrap();

        let checkpoint = Checkpoint::load(&path).unwrap();
        assert_eq!(checkpoint.resume_page(5, 10), 8);
        assert_eq!(checkpoint.resume_page(5, 7), 8);
        assert_eq!(checkpoint.resume_page(5, 6), 7);
        assert_eq!(checkpoint.resume_page(9, 12), 9);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partition_1.json");
        fs::write(&path, "[{\"soldDate\": ").unwrap();
        assert!(Checkpoint::load(&path).is_err());
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partition_1.json");
        write_records(&path, &[]).unwrap();
        write_records(&path, &[]).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "[]");
    }
}
