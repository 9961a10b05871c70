//! Scraper settings.
//!
//! Layered with figment: built-in defaults, then an optional TOML file, then
//! `SOLDHIST_*` environment variables. Command-line flags are applied on top
//! by the binary.

use crate::{Result, SoldError};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Which page fetcher backs a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    /// Headless Chrome; renders client-side content.
    Chrome,
    /// Plain HTTP GET; only works when cards are server-rendered.
    Http,
    /// Saved `page-<n>.html` files in `pages_dir`.
    Directory,
}

impl std::fmt::Display for FetcherKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetcherKind::Chrome => write!(f, "chrome"),
            FetcherKind::Http => write!(f, "http"),
            FetcherKind::Directory => write!(f, "directory"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// URL of the first index page.
    #[serde(default = "default_base_url")]
    pub base_url: Url,

    #[serde(default = "default_fetcher")]
    pub fetcher: FetcherKind,

    /// Required by the directory fetcher.
    #[serde(default)]
    pub pages_dir: Option<PathBuf>,

    /// Upper bound on a single page navigation.
    #[serde(default = "default_page_timeout")]
    pub page_timeout_secs: u64,

    /// Upper bound on waiting for listing cards to render.
    #[serde(default = "default_card_wait_timeout")]
    pub card_wait_timeout_secs: u64,

    #[serde(default = "default_card_selector")]
    pub card_selector: String,

    #[serde(default = "default_consent_selector")]
    pub consent_selector: String,

    #[serde(default = "default_headless")]
    pub headless: bool,

    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_base_url() -> Url {
    Url::parse("https://www.myhome.ie/priceregister").expect("default base URL is valid")
}

fn default_fetcher() -> FetcherKind {
    FetcherKind::Chrome
}

fn default_page_timeout() -> u64 {
    30
}

fn default_card_wait_timeout() -> u64 {
    15
}

fn default_card_selector() -> String {
    ".PropertyListingCard".to_string()
}

fn default_consent_selector() -> String {
    "#onetrust-accept-btn-handler".to_string()
}

fn default_headless() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            fetcher: default_fetcher(),
            pages_dir: None,
            page_timeout_secs: default_page_timeout(),
            card_wait_timeout_secs: default_card_wait_timeout(),
            card_selector: default_card_selector(),
            consent_selector: default_consent_selector(),
            headless: default_headless(),
            chrome_path: None,
            user_agent: None,
        }
    }
}

impl Settings {
    /// Load settings, reading `path` when given. Call [`Settings::validate`]
    /// once any command-line overrides have been applied.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = path {
            if !path.exists() {
                return Err(SoldError::Config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }

        figment
            .merge(Env::prefixed("SOLDHIST_"))
            .extract()
            .map_err(|e| SoldError::Config(e.to_string()))
    }

    /// Parse settings from a TOML string without consulting the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::string(toml))
            .extract()
            .map_err(|e| SoldError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetcher == FetcherKind::Directory && self.pages_dir.is_none() {
            return Err(SoldError::Config(
                "the directory fetcher needs pages_dir".to_string(),
            ));
        }
        if self.page_timeout_secs == 0 || self.card_wait_timeout_secs == 0 {
            return Err(SoldError::Config("timeouts must be at least one second".to_string()));
        }
        if self.card_selector.trim().is_empty() {
            return Err(SoldError::Config("card_selector must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn card_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.card_wait_timeout_secs)
    }
}
