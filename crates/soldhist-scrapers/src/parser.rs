//! Listing card parser.
//!
//! A card's rendered text looks roughly like
//!
//! ```text
//! SOLD 12/03/2024
//! 12 Main Street, Ranelagh, Dublin 6
//! Sold: €450,000
//! Asking: €425,000
//! 3 Bed · 2 Bath · 110 m² · Semi-Detached
//! ```
//!
//! The date, both prices and the address are mandatory. Everything else is
//! picked up opportunistically from the text outside the address.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use soldhist_core::{PropertyType, ScrapedListingRecord};
use thiserror::Error;
use url::Url;

pub const MIN_ADDRESS_LEN: usize = 10;

static SOLD_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bSOLD\s+(\d{1,2})/(\d{1,2})/(\d{4})\b").unwrap());
static SOLD_PRICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Sold:\s*[€£$]\s*([\d,.]+)").unwrap());
static ASKING_PRICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Asking:\s*[€£$]\s*([\d,.]+)").unwrap());
static AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d{1,3}(?:,\d{3})+|\d+)$").unwrap());
static BEDS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})\s*beds?\b").unwrap());
static BATHS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})\s*baths?\b").unwrap());
static AREA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,3}(?:,\d{3})+|\d+(?:\.\d+)?)\s*(?:m²|m2|sq\.?\s?m)").unwrap()
});
static PROPERTY_TYPES: Lazy<Vec<(PropertyType, Regex)>> = Lazy::new(|| {
    PropertyType::ALL
        .iter()
        .map(|t| {
            let pattern = match t {
                PropertyType::Detached => r"(?i)\bdetached\b",
                PropertyType::SemiDetached => r"(?i)\bsemi[-\s]?detached\b",
                PropertyType::Terrace => r"(?i)\bterraced?\b",
                PropertyType::EndOfTerrace => r"(?i)\bend[-\s]of[-\s]terrace\b",
                PropertyType::Townhouse => r"(?i)\btown\s?house\b",
                PropertyType::Apartment => r"(?i)\bapartment\b",
                PropertyType::Duplex => r"(?i)\bduplex\b",
                PropertyType::Bungalow => r"(?i)\bbungalow\b",
                PropertyType::Site => r"(?i)\bsite\b",
            };
            (*t, Regex::new(pattern).unwrap())
        })
        .collect()
});

/// Why a card produced no record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no SOLD date token")]
    MissingSoldDate,
    #[error("SOLD date {0} is not a calendar date")]
    InvalidSoldDate(String),
    #[error("no Sold: price")]
    MissingSoldPrice,
    #[error("no Asking: price")]
    MissingAskingPrice,
    #[error("amount {0:?} is not a positive whole number")]
    InvalidAmount(String),
    #[error("Sold: price appears before the SOLD date")]
    MisplacedSoldPrice,
    #[error("address {0:?} is shorter than 10 characters")]
    AddressTooShort(String),
}

/// Parse one card's text into a record.
///
/// Rejection is an ordinary outcome; callers count it and move on.
pub fn parse_card(text: &str, page_url: &Url) -> Result<ScrapedListingRecord, Rejection> {
    let date = SOLD_DATE.captures(text).ok_or(Rejection::MissingSoldDate)?;
    let date_span = date.get(0).map(|m| m.range()).unwrap_or_default();
    let sold_date = parse_date(&date[1], &date[2], &date[3])?;

    let sold = SOLD_PRICE.captures(text).ok_or(Rejection::MissingSoldPrice)?;
    let sold_start = sold.get(0).map(|m| m.start()).unwrap_or_default();
    let sold_price = parse_amount(&sold[1])?;

    let asking = ASKING_PRICE.captures(text).ok_or(Rejection::MissingAskingPrice)?;
    let asking_price = parse_amount(&asking[1])?;

    if sold_start < date_span.end {
        return Err(Rejection::MisplacedSoldPrice);
    }

    let address = text[date_span.end..sold_start]
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '-' | '|' | '·' | '•'))
        .to_string();
    if address.chars().count() < MIN_ADDRESS_LEN {
        return Err(Rejection::AddressTooShort(address));
    }

    let rest = format!("{}\n{}", &text[..date_span.start], &text[sold_start..]);

    Ok(ScrapedListingRecord {
        sold_date,
        address,
        sold_price,
        asking_price,
        over_under_percent: ScrapedListingRecord::over_under(sold_price, asking_price),
        beds: capture_number(&BEDS, &rest),
        baths: capture_number(&BATHS, &rest),
        area_sqm: parse_area(&rest),
        property_type: find_property_type(&rest),
        source_page_url: page_url.clone(),
        latitude: None,
        longitude: None,
        postal_code: None,
    })
}

fn parse_date(day: &str, month: &str, year: &str) -> Result<NaiveDate, Rejection> {
    let invalid = || Rejection::InvalidSoldDate(format!("{}/{}/{}", day, month, year));
    let day = day.parse::<u32>().map_err(|_| invalid())?;
    let month = month.parse::<u32>().map_err(|_| invalid())?;
    let year = year.parse::<i32>().map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

fn parse_amount(raw: &str) -> Result<u64, Rejection> {
    let raw = raw.trim_end_matches(|c: char| c == '.' || c == ',');
    if !AMOUNT.is_match(raw) {
        return Err(Rejection::InvalidAmount(raw.to_string()));
    }
    match raw.replace(',', "").parse::<u64>() {
        Ok(amount) if amount > 0 => Ok(amount),
        _ => Err(Rejection::InvalidAmount(raw.to_string())),
    }
}

fn capture_number(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text).and_then(|c| c[1].parse().ok())
}

fn parse_area(text: &str) -> Option<f64> {
    AREA.captures(text)
        .and_then(|c| c[1].replace(',', "").parse::<f64>().ok())
        .filter(|area| *area > 0.0)
}

fn find_property_type(text: &str) -> Option<PropertyType> {
    PROPERTY_TYPES
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(t, _)| *t)
}
