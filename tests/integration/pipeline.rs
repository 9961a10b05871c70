use crate::{records_in, soldhist, stderr_of, write_page, BASE_URL};
use soldhist_scrapers::testing::fixtures;
use std::path::Path;
use tempfile::tempdir;

/// Three pages, each with one good card and one malformed card.
fn three_pages(pages_dir: &Path) {
    let good = [
        ("10/01/2024", "12 Main Street, Kilkenny"),
        ("15/03/2024", "4 Harbour View, Cobh, Co. Cork"),
        ("02/02/2024", "Apartment 9, The Maltings, Galway"),
    ];
    for (page, (date, address)) in (1..=3).zip(good) {
        write_page(
            pages_dir,
            page,
            &[fixtures::card(date, address, 320_000, 300_000), fixtures::malformed_card()],
        );
    }
}

fn scrape_args(pages_dir: &Path, output_dir: &Path, extra: &[&str]) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "scrape".into(),
        "--fetcher".into(),
        "directory".into(),
        "--pages-dir".into(),
        pages_dir.to_str().unwrap().into(),
        "--base-url".into(),
        BASE_URL.into(),
        "--output-dir".into(),
        output_dir.to_str().unwrap().into(),
    ];
    args.extend(extra.iter().map(|a| a.to_string()));
    args
}

#[test]
fn test_scrape_merges_all_partitions_newest_first() {
    let dir = tempdir().unwrap();
    let pages_dir = dir.path().join("pages");
    let output_dir = dir.path().join("data");
    three_pages(&pages_dir);

    let output = soldhist(scrape_args(&pages_dir, &output_dir, &["--total-pages", "3", "--workers", "3"]));
    assert!(output.status.success(), "{}", stderr_of(&output));

    let merged = records_in(&output_dir.join("sold_listings.json"));
    let dates: Vec<String> = merged.iter().map(|r| r.sold_date.to_string()).collect();
    assert_eq!(dates, vec!["2024-03-15", "2024-02-02", "2024-01-10"]);
    assert_eq!(merged[0].source_page_url.as_str(), "https://example.com/sold/page-2");
    assert_eq!(merged[2].source_page_url.as_str(), BASE_URL);

    for id in 1..=3 {
        let partition = records_in(&output_dir.join(format!("partition_{}.json", id)));
        assert_eq!(partition.len(), 1, "partition {}", id);
        assert_eq!(partition[0].page_number(), id);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("3 records written to"));
}

#[test]
fn test_failed_worker_leaves_partial_result() {
    let dir = tempdir().unwrap();
    let pages_dir = dir.path().join("pages");
    let output_dir = dir.path().join("data");
    three_pages(&pages_dir);
    std::fs::remove_file(pages_dir.join("page-2.html")).unwrap();

    let mut args = scrape_args(&pages_dir, &output_dir, &["--total-pages", "3", "--workers", "3"]);
    let output = soldhist(&args);

    // Best effort by default: the job still succeeds with what it has
    assert!(output.status.success(), "{}", stderr_of(&output));
    let merged = records_in(&output_dir.join("sold_listings.json"));
    assert_eq!(merged.len(), 2);
    assert!(!output_dir.join("partition_2.json").exists());
    assert!(String::from_utf8_lossy(&output.stdout).contains("1 of 3 workers failed"));

    args.push("--strict".to_string());
    let strict = soldhist(&args);
    assert!(!strict.status.success());
}

#[test]
fn test_cleanup_keeps_failed_partition_for_resume() {
    let dir = tempdir().unwrap();
    let pages_dir = dir.path().join("pages");
    let output_dir = dir.path().join("data");
    three_pages(&pages_dir);

    // pages 1-2 and 3-4; there is no page 4, so the second partition stops after page 3
    let output = soldhist(scrape_args(
        &pages_dir,
        &output_dir,
        &["--total-pages", "4", "--workers", "2", "--cleanup"],
    ));
    assert!(output.status.success(), "{}", stderr_of(&output));

    assert!(!output_dir.join("partition_1.json").exists());
    let kept = records_in(&output_dir.join("partition_2.json"));
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].page_number(), 3);
    assert_eq!(records_in(&output_dir.join("sold_listings.json")).len(), 3);
}

#[test]
fn test_more_workers_than_pages() {
    let dir = tempdir().unwrap();
    let pages_dir = dir.path().join("pages");
    let output_dir = dir.path().join("data");
    three_pages(&pages_dir);

    let output = soldhist(scrape_args(&pages_dir, &output_dir, &["--total-pages", "2", "--workers", "5"]));
    assert!(output.status.success(), "{}", stderr_of(&output));

    assert!(output_dir.join("partition_2.json").exists());
    assert!(!output_dir.join("partition_3.json").exists());
    assert_eq!(records_in(&output_dir.join("sold_listings.json")).len(), 2);
}

#[test]
fn test_directory_fetcher_without_pages_dir_is_rejected() {
    let dir = tempdir().unwrap();
    let output = soldhist([
        "scrape",
        "--fetcher",
        "directory",
        "--total-pages",
        "1",
        "--output-dir",
        dir.path().to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("pages_dir"));
    assert!(!dir.path().join("partition_1.json").exists());
}
