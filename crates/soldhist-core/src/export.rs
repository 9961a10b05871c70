use crate::checkpoint::read_records;
use crate::{Result, ScrapedListingRecord};
use csv::Writer;
use std::io::{self, Write};
use std::path::Path;

const HEADER: [&str; 13] = [
    "Sold Date",
    "Address",
    "Sold Price",
    "Asking Price",
    "Over/Under (%)",
    "Beds",
    "Baths",
    "Area (m²)",
    "Property Type",
    "Source Page",
    "Latitude",
    "Longitude",
    "Postal Code",
];

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

pub fn write_csv<W: Write>(records: &[ScrapedListingRecord], out: W) -> Result<()> {
    let mut writer = Writer::from_writer(out);
    writer.write_record(HEADER)?;
    for record in records {
        writer.write_record(&[
            record.sold_date.format("%Y-%m-%d").to_string(),
            record.address.clone(),
            record.sold_price.to_string(),
            record.asking_price.to_string(),
            format!("{:.1}", record.over_under_percent),
            opt(&record.beds),
            opt(&record.baths),
            opt(&record.area_sqm),
            record.property_type.map(|t| t.as_str().to_string()).unwrap_or_default(),
            record.source_page_url.to_string(),
            opt(&record.latitude),
            opt(&record.longitude),
            opt(&record.postal_code),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Convert a merged JSON dataset into CSV. Returns the number of rows written.
pub fn export_csv(input: &Path, output: &Path) -> Result<usize> {
    let records = read_records(input)?
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("No dataset at {}", input.display())))?;
    let file = std::fs::File::create(output)?;
    write_csv(&records, file)?;
    Ok(records.len())
}
