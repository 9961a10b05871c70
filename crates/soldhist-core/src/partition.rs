use crate::{Result, SoldError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A contiguous page range owned by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub id: u32,
    pub start_page: u32,
    pub end_page: u32,
    pub output_path: PathBuf,
}

impl Partition {
    pub fn page_count(&self) -> u32 {
        self.end_page - self.start_page + 1
    }

    pub fn output_path_for(output_dir: &Path, id: u32) -> PathBuf {
        output_dir.join(format!("partition_{}.json", id))
    }
}

/// Split of `[1, total_pages]` into per-worker partitions.
///
/// Each partition gets `ceil(total_pages / worker_count)` pages; the last one
/// takes whatever is left. When the ceiling leaves nothing for the trailing
/// workers, fewer partitions are produced rather than empty ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    pub total_pages: u32,
    pub partitions: Vec<Partition>,
}

impl PartitionPlan {
    pub fn new(total_pages: u32, worker_count: u32, output_dir: &Path) -> Result<Self> {
        if total_pages == 0 {
            return Err(SoldError::InvalidPartition("total pages must be at least 1".to_string()));
        }
        if worker_count == 0 {
            return Err(SoldError::InvalidPartition("worker count must be at least 1".to_string()));
        }

        let per_partition = total_pages.div_ceil(worker_count);
        let mut partitions = Vec::new();

        for index in 0..worker_count {
            let start_page = index * per_partition + 1;
            if start_page > total_pages {
                break;
            }
            let end_page = if index == worker_count - 1 {
                total_pages
            } else {
                ((index + 1) * per_partition).min(total_pages)
            };
            let id = index + 1;
            partitions.push(Partition {
                id,
                start_page,
                end_page,
                output_path: Partition::output_path_for(output_dir, id),
            });
        }

        Ok(Self { total_pages, partitions })
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn output_paths(&self) -> Vec<PathBuf> {
        self.partitions.iter().map(|p| p.output_path.clone()).collect()
    }
}
