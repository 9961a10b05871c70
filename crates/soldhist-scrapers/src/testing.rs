//! Test doubles for the page fetcher.
//!
//! ```rust,ignore
//! use soldhist_scrapers::testing::{fixtures, ScriptedFetcher};
//!
//! let mut fetcher = ScriptedFetcher::new()
//!     .with_page(5, vec![fixtures::card("01/02/2024", "5 Church Road, Tralee", 300_000, 280_000)])
//!     .failing_at(6);
//! ```

use crate::{Advisory, PageFetcher};
use async_trait::async_trait;
use soldhist_core::{Result, SoldError};
use std::collections::{HashMap, HashSet};
use url::Url;

/// In-memory fetcher with scripted pages and failure injection.
///
/// Pages without a script navigate fine but never show any cards, which the
/// worker sees as a card-region timeout.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    pages: HashMap<u32, Vec<String>>,
    failing: HashSet<u32>,
    consent_fails: bool,
    consent_attempts: usize,
    fetched: Vec<u32>,
    current: Option<(u32, Url)>,
    shut_down: bool,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: u32, cards: Vec<String>) -> Self {
        self.pages.insert(page, cards);
        self
    }

    pub fn with_pages(mut self, pages: impl IntoIterator<Item = (u32, Vec<String>)>) -> Self {
        self.pages.extend(pages);
        self
    }

    /// Navigation to `page` fails as if it timed out.
    pub fn failing_at(mut self, page: u32) -> Self {
        self.failing.insert(page);
        self
    }

    pub fn with_failing_consent(mut self) -> Self {
        self.consent_fails = true;
        self
    }

    /// Pages navigated to, in order, including failed ones.
    pub fn fetched_pages(&self) -> Vec<u32> {
        self.fetched.clone()
    }

    pub fn consent_attempts(&self) -> usize {
        self.consent_attempts
    }

    pub fn was_shut_down(&self) -> bool {
        self.shut_down
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn navigate(&mut self, page: u32, url: &Url) -> Result<()> {
        self.fetched.push(page);
        if self.failing.contains(&page) {
            self.current = None;
            return Err(SoldError::Timeout {
                what: format!("loading {}", url),
                secs: 30,
            });
        }
        self.current = Some((page, url.clone()));
        Ok(())
    }

    async fn accept_consent(&mut self) -> Advisory {
        self.consent_attempts += 1;
        if self.consent_fails {
            Advisory::Failed("consent button not found".to_string())
        } else {
            Advisory::Completed
        }
    }

    async fn wait_for_cards(&mut self) -> Result<()> {
        match &self.current {
            Some((page, _)) if self.pages.contains_key(page) => Ok(()),
            Some((_, url)) => Err(SoldError::MissingCardRegion {
                url: url.to_string(),
                secs: 15,
            }),
            None => Err(SoldError::Scraping("no page loaded".to_string())),
        }
    }

    async fn card_texts(&mut self) -> Result<Vec<String>> {
        let page = self
            .current
            .as_ref()
            .map(|(page, _)| *page)
            .ok_or_else(|| SoldError::Scraping("no page loaded".to_string()))?;
        Ok(self.pages.get(&page).cloned().unwrap_or_default())
    }

    async fn shutdown(&mut self) {
        self.shut_down = true;
    }
}

/// Card text builders.
pub mod fixtures {
    /// A well-formed card.
    pub fn card(date: &str, address: &str, sold: u64, asking: u64) -> String {
        format!(
            "SOLD {}\n{}\nSold: €{}\nAsking: €{}\n3 Bed · 1 Bath · 92 m² · Terrace",
            date,
            address,
            group_thousands(sold),
            group_thousands(asking)
        )
    }

    /// A card the parser always rejects (no prices).
    pub fn malformed_card() -> String {
        "SOLD 01/01/2024\nPrice on application\nContact agent".to_string()
    }

    fn group_thousands(n: u64) -> String {
        let digits = n.to_string();
        let mut out = String::new();
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(c);
        }
        out
    }

}
