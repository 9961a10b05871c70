pub mod chrome;
pub mod directory;
pub mod http;
pub mod orchestrator;
pub mod parser;
pub mod testing;
pub mod worker;

use async_trait::async_trait;
use soldhist_core::{FetcherKind, Result, Settings};
use tracing::debug;
use url::Url;

pub use chrome::ChromeFetcher;
pub use directory::DirectoryFetcher;
pub use http::HttpFetcher;
pub use orchestrator::{run_job, run_workers, JobOptions, JobReport, PartitionOutcome, WorkerProgram};
pub use parser::{parse_card, Rejection};
pub use worker::{run_worker, WorkerAssignment, WorkerSummary};

/// Outcome of a best-effort step.
///
/// Advisory steps may fail without affecting the surrounding control flow.
/// The only thing a caller does with one is [`Advisory::log`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    Completed,
    Failed(String),
}

impl Advisory {
    pub fn log(self, step: &str) {
        match self {
            Advisory::Completed => debug!("{} completed", step),
            Advisory::Failed(reason) => debug!("{} skipped: {}", step, reason),
        }
    }
}

/// Access to rendered listing pages.
///
/// One fetcher serves one worker and is driven strictly sequentially.
#[async_trait]
pub trait PageFetcher: Send {
    /// Load the given page. Bounded by the page timeout.
    async fn navigate(&mut self, page: u32, url: &Url) -> Result<()>;

    /// Dismiss a cookie/consent banner on the current page, if there is one.
    async fn accept_consent(&mut self) -> Advisory;

    /// Wait for listing cards to appear on the current page. Bounded by the
    /// card wait timeout.
    async fn wait_for_cards(&mut self) -> Result<()>;

    /// Rendered text of every listing card on the current page, in page order.
    async fn card_texts(&mut self) -> Result<Vec<String>>;

    /// Release the underlying resources (browser process, connections).
    async fn shutdown(&mut self) {}

    /// Fetch one page worth of card texts.
    ///
    /// The consent step runs only when `first_of_run` is set; its outcome is
    /// logged and dropped.
    async fn fetch_cards(&mut self, page: u32, url: &Url, first_of_run: bool) -> Result<Vec<String>> {
        self.navigate(page, url).await?;
        if first_of_run {
            self.accept_consent().await.log("consent dismissal");
        }
        self.wait_for_cards().await?;
        self.card_texts().await
    }
}

/// Factory for creating fetchers from settings
pub struct FetcherFactory;

impl FetcherFactory {
    pub async fn create_fetcher(settings: &Settings) -> Result<Box<dyn PageFetcher>> {
        match settings.fetcher {
            FetcherKind::Chrome => Ok(Box::new(ChromeFetcher::launch(settings).await?)),
            FetcherKind::Http => Ok(Box::new(HttpFetcher::new(settings)?)),
            FetcherKind::Directory => Ok(Box::new(DirectoryFetcher::new(settings)?)),
        }
    }
}
