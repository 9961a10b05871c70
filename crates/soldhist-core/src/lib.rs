use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use url::Url;

mod error;
pub mod checkpoint;
pub mod config;
mod display;
pub mod export;
pub mod merge;
pub mod pages;
pub mod partition;

pub use checkpoint::Checkpoint;
pub use config::{FetcherKind, Settings};
pub use display::{create_report_table, PartitionRow};
pub use error::{Result, SoldError};
pub use merge::{merge_partitions, MergeOptions, MergeOutcome};
pub use pages::PageUrls;
pub use partition::{Partition, PartitionPlan};

/// Closed set of property categories recognised on listing cards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyType {
    Detached,
    SemiDetached,
    Terrace,
    EndOfTerrace,
    Townhouse,
    Apartment,
    Duplex,
    Bungalow,
    Site,
}

impl PropertyType {
    /// Every variant, ordered so that longer keywords come before the
    /// keywords they contain ("semi-detached" before "detached").
    pub const ALL: [PropertyType; 9] = [
        PropertyType::SemiDetached,
        PropertyType::EndOfTerrace,
        PropertyType::Detached,
        PropertyType::Terrace,
        PropertyType::Townhouse,
        PropertyType::Apartment,
        PropertyType::Duplex,
        PropertyType::Bungalow,
        PropertyType::Site,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Detached => "detached",
            PropertyType::SemiDetached => "semi-detached",
            PropertyType::Terrace => "terrace",
            PropertyType::EndOfTerrace => "end-of-terrace",
            PropertyType::Townhouse => "townhouse",
            PropertyType::Apartment => "apartment",
            PropertyType::Duplex => "duplex",
            PropertyType::Bungalow => "bungalow",
            PropertyType::Site => "site",
        }
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyType::Detached => write!(f, "Detached"),
            PropertyType::SemiDetached => write!(f, "Semi-Detached"),
            PropertyType::Terrace => write!(f, "Terrace"),
            PropertyType::EndOfTerrace => write!(f, "End of Terrace"),
            PropertyType::Townhouse => write!(f, "Townhouse"),
            PropertyType::Apartment => write!(f, "Apartment"),
            PropertyType::Duplex => write!(f, "Duplex"),
            PropertyType::Bungalow => write!(f, "Bungalow"),
            PropertyType::Site => write!(f, "Site"),
        }
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(' ', "-").as_str() {
            "detached" | "detached-house" => Ok(PropertyType::Detached),
            "semi-detached" | "semi-detached-house" | "semi" => Ok(PropertyType::SemiDetached),
            "terrace" | "terraced" | "terraced-house" => Ok(PropertyType::Terrace),
            "end-of-terrace" | "end-terrace" => Ok(PropertyType::EndOfTerrace),
            "townhouse" => Ok(PropertyType::Townhouse),
            "apartment" | "flat" => Ok(PropertyType::Apartment),
            "duplex" => Ok(PropertyType::Duplex),
            "bungalow" => Ok(PropertyType::Bungalow),
            "site" => Ok(PropertyType::Site),
            _ => Err(format!(
                "Invalid property type: {}. Valid options are: detached, semi-detached, terrace, end-of-terrace, townhouse, apartment, duplex, bungalow, site",
                s
            )),
        }
    }
}

/// One sold listing as extracted from a listing card.
///
/// Records are created once by the card parser and never modified. The
/// location fields are only ever filled in by the external geocoding step;
/// they are carried here so enriched files survive a merge or export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedListingRecord {
    pub sold_date: NaiveDate,
    pub address: String,
    pub sold_price: u64,
    pub asking_price: u64,
    pub over_under_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baths: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_sqm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    pub source_page_url: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

impl ScrapedListingRecord {
    /// Percentage over (positive) or under (negative) asking, rounded to one
    /// decimal place.
    pub fn over_under(sold_price: u64, asking_price: u64) -> f64 {
        let raw = (sold_price as f64 - asking_price as f64) / asking_price as f64 * 100.0;
        (raw * 10.0).round() / 10.0
    }

    /// Page number this record was scraped from.
    pub fn page_number(&self) -> u32 {
        pages::page_number(&self.source_page_url)
    }

    /// Identity used by the merge stage to drop repeated listings.
    pub fn dedup_key(&self) -> (String, NaiveDate, u64) {
        let address = self
            .address
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        (address, self.sold_date, self.sold_price)
    }
}
