use crate::{Advisory, PageFetcher};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use soldhist_core::{Result, Settings, SoldError};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info};
use url::Url;

const CARD_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Headless Chrome driven over the DevTools protocol.
///
/// Each fetcher owns its own browser process and a single tab, so workers
/// never share browser state.
pub struct ChromeFetcher {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
    card_selector: String,
    consent_selector: String,
    page_timeout: Duration,
    card_wait_timeout: Duration,
    current_url: Option<Url>,
}

fn cdp_error(e: chromiumoxide::error::CdpError) -> SoldError {
    SoldError::Scraping(e.to_string())
}

impl ChromeFetcher {
    pub async fn launch(settings: &Settings) -> Result<Self> {
        let mut builder = BrowserConfig::builder().request_timeout(settings.page_timeout());
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &settings.chrome_path {
            builder = builder.chrome_executable(path);
        }
        if let Some(user_agent) = &settings.user_agent {
            builder = builder.arg(format!("--user-agent={}", user_agent));
        }
        let config = builder.build().map_err(SoldError::Scraping)?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(cdp_error)?;
        let handler = tokio::spawn(async move {
            while handler.next().await.is_some() {}
        });
        let page = browser.new_page("about:blank").await.map_err(cdp_error)?;
        info!("Launched browser (headless: {})", settings.headless);

        Ok(Self {
            browser,
            handler,
            page,
            card_selector: settings.card_selector.clone(),
            consent_selector: settings.consent_selector.clone(),
            page_timeout: settings.page_timeout(),
            card_wait_timeout: settings.card_wait_timeout(),
            current_url: None,
        })
    }

    fn current_url(&self) -> String {
        self.current_url
            .as_ref()
            .map(Url::to_string)
            .unwrap_or_else(|| "about:blank".to_string())
    }
}

#[async_trait]
impl PageFetcher for ChromeFetcher {
    async fn navigate(&mut self, page: u32, url: &Url) -> Result<()> {
        info!("Navigating to page {}: {}", page, url);
        self.current_url = Some(url.clone());

        match timeout(self.page_timeout, self.page.goto(url.as_str())).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(cdp_error(e)),
            Err(_) => Err(SoldError::Timeout {
                what: format!("loading {}", url),
                secs: self.page_timeout.as_secs(),
            }),
        }
    }

    async fn accept_consent(&mut self) -> Advisory {
        let click = async {
            let button = self.page.find_element(self.consent_selector.as_str()).await?;
            button.click().await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        };

        match timeout(self.page_timeout, click).await {
            Ok(Ok(())) => Advisory::Completed,
            Ok(Err(e)) => Advisory::Failed(e.to_string()),
            Err(_) => Advisory::Failed("consent button did not respond in time".to_string()),
        }
    }

    async fn wait_for_cards(&mut self) -> Result<()> {
        let page = &self.page;
        let selector = self.card_selector.as_str();
        let poll = async {
            loop {
                match page.find_elements(selector).await {
                    Ok(cards) if !cards.is_empty() => {
                        debug!("{} cards rendered", cards.len());
                        return;
                    }
                    _ => sleep(CARD_POLL_INTERVAL).await,
                }
            }
        };

        timeout(self.card_wait_timeout, poll).await.map_err(|_| SoldError::MissingCardRegion {
            url: self.current_url(),
            secs: self.card_wait_timeout.as_secs(),
        })
    }

    async fn card_texts(&mut self) -> Result<Vec<String>> {
        let cards = self
            .page
            .find_elements(self.card_selector.as_str())
            .await
            .map_err(cdp_error)?;

        let mut texts = Vec::with_capacity(cards.len());
        for card in cards {
            texts.push(card.inner_text().await.map_err(cdp_error)?.unwrap_or_default());
        }
        Ok(texts)
    }

    async fn shutdown(&mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("Browser close failed: {}", e);
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
    }
}
