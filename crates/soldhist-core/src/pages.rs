//! Page URL scheme of the sold-listings index.
//!
//! Page 1 is served from the base URL itself; every later page adds a
//! `page-<n>` path segment. The inverse mapping is what lets a worker work
//! out how far it got from nothing but the records in its checkpoint.

use crate::{Result, SoldError};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUrls {
    base: Url,
}

impl PageUrls {
    pub fn new(base: Url) -> Result<Self> {
        if base.cannot_be_a_base() {
            return Err(SoldError::Scraping(format!("Base URL cannot hold page segments: {}", base)));
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn page_url(&self, page: u32) -> Result<Url> {
        if page <= 1 {
            return Ok(self.base.clone());
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SoldError::Scraping(format!("Base URL cannot hold page segments: {}", self.base)))?
            .pop_if_empty()
            .push(&format!("page-{}", page));
        Ok(url)
    }
}

/// Recover the page number from a URL built by [`PageUrls::page_url`].
pub fn page_number(url: &Url) -> u32 {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .and_then(|segment| segment.strip_prefix("page-"))
        .and_then(|n| n.parse::<u32>().ok())
        .unwrap_or(1)
}
