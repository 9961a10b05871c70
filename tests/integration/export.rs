use crate::{records_in, soldhist, stderr_of};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_partition(path: &Path, records: serde_json::Value) {
    fs::write(path, serde_json::to_string_pretty(&records).unwrap()).unwrap();
}

fn record(date: &str, address: &str, page: u32) -> serde_json::Value {
    json!({
        "soldDate": date,
        "address": address,
        "soldPrice": 385000,
        "askingPrice": 395000,
        "overUnderPercent": -2.5,
        "beds": 3,
        "propertyType": "semi-detached",
        "sourcePageUrl": format!("https://example.com/sold/page-{}", page),
    })
}

#[test]
fn test_merge_command() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("partition_1.json");
    let second = dir.path().join("partition_2.json");
    let missing = dir.path().join("partition_3.json");
    let merged = dir.path().join("merged.json");

    write_partition(
        &first,
        json!([
            record("2024-01-05", "8 Mill Lane, Leixlip, Co. Kildare", 2),
            record("2024-03-01", "22 Orchard Grove, Carlow", 2),
        ]),
    );
    write_partition(
        &second,
        json!([
            record("2024-02-14", "1 Canal Bank, Tullamore", 3),
            record("2024-01-05", "8  MILL LANE, Leixlip, Co. Kildare", 3),
        ]),
    );

    let output = soldhist([
        "merge",
        "--output",
        merged.to_str().unwrap(),
        first.to_str().unwrap(),
        second.to_str().unwrap(),
        missing.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", stderr_of(&output));

    let records = records_in(&merged);
    let dates: Vec<String> = records.iter().map(|r| r.sold_date.to_string()).collect();
    assert_eq!(dates, vec!["2024-03-01", "2024-02-14", "2024-01-05"]);
    assert_eq!(records[2].address, "8 Mill Lane, Leixlip, Co. Kildare");
}

#[test]
fn test_merge_keep_duplicates() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("partition_1.json");
    let merged = dir.path().join("merged.json");
    write_partition(
        &first,
        json!([
            record("2024-01-05", "8 Mill Lane, Leixlip, Co. Kildare", 2),
            record("2024-01-05", "8 Mill Lane, Leixlip, Co. Kildare", 2),
        ]),
    );

    let output = soldhist([
        "merge",
        "--keep-duplicates",
        "--output",
        merged.to_str().unwrap(),
        first.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", stderr_of(&output));
    assert_eq!(records_in(&merged).len(), 2);
}

#[test]
fn test_export_command() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("sold_listings.json");
    let csv_path = dir.path().join("sold_listings.csv");
    write_partition(
        &input,
        json!([
            record("2024-03-01", "22 Orchard Grove, Carlow", 2),
            record("2024-01-05", "8 Mill Lane, Leixlip, Co. Kildare", 2),
        ]),
    );

    let output = soldhist([
        "export",
        "--input",
        input.to_str().unwrap(),
        "--output",
        csv_path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", stderr_of(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("2 records exported"));

    let csv = fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("2024-03-01,"));
    assert!(lines[1].contains("\"22 Orchard Grove, Carlow\""));
    assert!(lines[2].contains("semi-detached"));
}

#[test]
fn test_export_missing_input_fails() {
    let dir = tempdir().unwrap();
    let output = soldhist([
        "export",
        "--input",
        dir.path().join("nope.json").to_str().unwrap(),
        "--output",
        dir.path().join("out.csv").to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    assert!(!dir.path().join("out.csv").exists());
}
