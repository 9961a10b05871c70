use crate::{Advisory, PageFetcher};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use soldhist_core::{Result, Settings, SoldError};
use tracing::{debug, info};
use url::Url;

/// Fetches pages with plain HTTP requests.
///
/// Nothing is rendered, so this only finds cards the server puts in the
/// initial HTML. There is no consent banner to dismiss over HTTP.
#[derive(Debug)]
pub struct HttpFetcher {
    client: Client,
    card_selector: String,
    page_timeout_secs: u64,
    card_wait_timeout_secs: u64,
    current: Option<(Url, String)>,
    cards: Option<Vec<String>>,
}

impl HttpFetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        parse_selector(&settings.card_selector)?;

        let mut builder = Client::builder().timeout(settings.page_timeout());
        if let Some(user_agent) = &settings.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        Ok(Self {
            client: builder.build()?,
            card_selector: settings.card_selector.clone(),
            page_timeout_secs: settings.page_timeout_secs,
            card_wait_timeout_secs: settings.card_wait_timeout_secs,
            current: None,
            cards: None,
        })
    }

    async fn fetch_page(&self, url: &Url) -> Result<String> {
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                SoldError::Timeout {
                    what: format!("loading {}", url),
                    secs: self.page_timeout_secs,
                }
            } else {
                SoldError::Scraping(e.to_string())
            }
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(map_err)?;

        response.text().await.map_err(map_err)
    }
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| SoldError::Scraping(e.to_string()))
}

/// Text of every element matching `card_selector`, one string per card with
/// text nodes separated by newlines. `None` when nothing matches.
pub(crate) fn extract_cards(html: &str, card_selector: &str) -> Result<Option<Vec<String>>> {
    let selector = parse_selector(card_selector)?;
    let document = Html::parse_document(html);

    let cards: Vec<String> = document
        .select(&selector)
        .map(|card| {
            card.text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect();

    if cards.is_empty() {
        Ok(None)
    } else {
        Ok(Some(cards))
    }
}

/// Shared `wait_for_cards` for fetchers that hold a static HTML body.
pub(crate) fn cards_in_body(
    current: &Option<(Url, String)>,
    card_selector: &str,
    wait_secs: u64,
) -> Result<Vec<String>> {
    let (url, body) = current
        .as_ref()
        .ok_or_else(|| SoldError::Scraping("no page loaded".to_string()))?;

    extract_cards(body, card_selector)?.ok_or_else(|| SoldError::MissingCardRegion {
        url: url.to_string(),
        secs: wait_secs,
    })
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn navigate(&mut self, page: u32, url: &Url) -> Result<()> {
        info!("Fetching page {}: {}", page, url);
        self.cards = None;
        let body = self.fetch_page(url).await?;
        debug!("Page {} returned {} bytes", page, body.len());
        self.current = Some((url.clone(), body));
        Ok(())
    }

    async fn accept_consent(&mut self) -> Advisory {
        Advisory::Failed("plain HTTP pages have no consent banner".to_string())
    }

    async fn wait_for_cards(&mut self) -> Result<()> {
        let cards = cards_in_body(&self.current, &self.card_selector, self.card_wait_timeout_secs)?;
        self.cards = Some(cards);
        Ok(())
    }

    async fn card_texts(&mut self) -> Result<Vec<String>> {
        match self.cards.take() {
            Some(cards) => Ok(cards),
            None => cards_in_body(&self.current, &self.card_selector, self.card_wait_timeout_secs),
        }
    }
}
