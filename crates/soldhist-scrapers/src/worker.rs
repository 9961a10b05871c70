//! The per-partition scraping loop.
//!
//! A worker walks its page range in order. After every page it rewrites its
//! checkpoint with everything accepted so far, so the output file always
//! holds a complete snapshot and a restarted worker can pick up where the
//! file leaves off. The first fault ends the run; nothing is retried.

use crate::parser::parse_card;
use crate::PageFetcher;
use soldhist_core::{Checkpoint, PageUrls, Partition, Result, SoldError};
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerAssignment {
    pub worker_id: u32,
    pub start_page: u32,
    pub end_page: u32,
    pub output_path: PathBuf,
}

impl From<&Partition> for WorkerAssignment {
    fn from(partition: &Partition) -> Self {
        Self {
            worker_id: partition.id,
            start_page: partition.start_page,
            end_page: partition.end_page,
            output_path: partition.output_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    /// First page fetched in this run, or `end_page + 1` when nothing was left.
    pub resumed_at: u32,
    pub pages_fetched: u32,
    pub records_added: usize,
    pub records_total: usize,
    pub cards_rejected: usize,
}

impl WorkerSummary {
    pub fn already_complete(&self) -> bool {
        self.pages_fetched == 0
    }
}

/// Run one partition to completion or to its first fault.
///
/// The fetcher is shut down before returning, whatever the outcome.
pub async fn run_worker(
    assignment: &WorkerAssignment,
    fetcher: &mut dyn PageFetcher,
    urls: &PageUrls,
) -> Result<WorkerSummary> {
    let result = scrape_range(assignment, fetcher, urls).await;
    fetcher.shutdown().await;

    if let Err(e) = &result {
        warn!(
            "Worker {} stopped: {}. Progress so far is kept in {}",
            assignment.worker_id,
            e,
            assignment.output_path.display()
        );
    }
    result
}

async fn scrape_range(
    assignment: &WorkerAssignment,
    fetcher: &mut dyn PageFetcher,
    urls: &PageUrls,
) -> Result<WorkerSummary> {
    let WorkerAssignment { worker_id, start_page, end_page, .. } = *assignment;
    if start_page == 0 || start_page > end_page {
        return Err(SoldError::InvalidPartition(format!(
            "worker {} was given pages {}-{}",
            worker_id, start_page, end_page
        )));
    }

    let mut checkpoint = Checkpoint::load(&assignment.output_path)?;
    let resume_at = checkpoint.resume_page(start_page, end_page);
    let mut summary = WorkerSummary {
        resumed_at: resume_at,
        records_total: checkpoint.len(),
        ..Default::default()
    };

    if resume_at > end_page {
        info!(
            "Pages {}-{} already complete ({} records), nothing to do",
            start_page,
            end_page,
            checkpoint.len()
        );
        return Ok(summary);
    }
    if resume_at > start_page {
        info!(
            "Resuming at page {} with {} records already checkpointed",
            resume_at,
            checkpoint.len()
        );
    } else {
        info!("Starting pages {}-{}", start_page, end_page);
    }

    for page in resume_at..=end_page {
        let url = urls.page_url(page)?;
        let cards = fetcher.fetch_cards(page, &url, page == resume_at).await?;

        let mut accepted = Vec::with_capacity(cards.len());
        let mut rejected = 0;
        for text in &cards {
            match parse_card(text, &url) {
                Ok(record) => accepted.push(record),
                Err(reason) => {
                    rejected += 1;
                    debug!("Rejected card on page {}: {}", page, reason);
                }
            }
        }

        let added = accepted.len();
        checkpoint.append_page(accepted)?;

        summary.pages_fetched += 1;
        summary.records_added += added;
        summary.records_total = checkpoint.len();
        summary.cards_rejected += rejected;

        if rejected > 0 {
            debug!("Page {}: {} of {} cards rejected", page, rejected, cards.len());
        }
        info!(
            "Page {} ({}/{}): {} records, {} total",
            page,
            page - start_page + 1,
            end_page - start_page + 1,
            added,
            checkpoint.len()
        );
    }

    info!(
        "Finished pages {}-{}: {} records ({} new this run)",
        start_page, end_page, summary.records_total, summary.records_added
    );
    Ok(summary)
}
