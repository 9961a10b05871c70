use crate::http::{cards_in_body, parse_selector};
use crate::{Advisory, PageFetcher};
use async_trait::async_trait;
use soldhist_core::{Result, Settings, SoldError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;
use url::Url;

/// Replays index pages saved as `page-<n>.html` in a directory.
///
/// Useful for re-parsing a previous crawl offline. A missing page file is a
/// navigation fault, exactly like a page that fails to load.
#[derive(Debug)]
pub struct DirectoryFetcher {
    pages_dir: PathBuf,
    card_selector: String,
    card_wait_timeout_secs: u64,
    current: Option<(Url, String)>,
}

impl DirectoryFetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        let pages_dir = settings
            .pages_dir
            .clone()
            .ok_or_else(|| SoldError::Config("the directory fetcher needs pages_dir".to_string()))?;
        parse_selector(&settings.card_selector)?;

        Ok(Self {
            pages_dir,
            card_selector: settings.card_selector.clone(),
            card_wait_timeout_secs: settings.card_wait_timeout_secs,
            current: None,
        })
    }

    pub fn page_path(pages_dir: &Path, page: u32) -> PathBuf {
        pages_dir.join(format!("page-{}.html", page))
    }
}

#[async_trait]
impl PageFetcher for DirectoryFetcher {
    async fn navigate(&mut self, page: u32, url: &Url) -> Result<()> {
        let path = Self::page_path(&self.pages_dir, page);
        info!("Loading saved page {} from {}", page, path.display());

        let body = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                SoldError::Scraping(format!("no saved copy of page {} at {}", page, path.display()))
            } else {
                SoldError::Io(e)
            }
        })?;
        self.current = Some((url.clone(), body));
        Ok(())
    }

    async fn accept_consent(&mut self) -> Advisory {
        Advisory::Failed("saved pages have no consent banner".to_string())
    }

    async fn wait_for_cards(&mut self) -> Result<()> {
        cards_in_body(&self.current, &self.card_selector, self.card_wait_timeout_secs).map(|_| ())
    }

    async fn card_texts(&mut self) -> Result<Vec<String>> {
        cards_in_body(&self.current, &self.card_selector, self.card_wait_timeout_secs)
    }
}
