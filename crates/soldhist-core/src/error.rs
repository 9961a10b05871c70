use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SoldError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Scraping error: {0}")]
    Scraping(String),
    #[error("Timed out after {secs}s while {what}")]
    Timeout { what: String, secs: u64 },
    #[error("Listing cards never appeared on {url} within {secs}s")]
    MissingCardRegion { url: String, secs: u64 },
    #[error("Invalid partition: {0}")]
    InvalidPartition(String),
    #[error("Worker error: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, SoldError>;
