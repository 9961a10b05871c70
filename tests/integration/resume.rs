use crate::{records_in, soldhist, stderr_of, write_page, BASE_URL};
use soldhist_scrapers::testing::fixtures;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_pages(pages_dir: &Path, pages: impl IntoIterator<Item = u32>) {
    for page in pages {
        write_page(
            pages_dir,
            page,
            &[
                fixtures::card(
                    &format!("{:02}/06/2023", page),
                    &format!("{} Church Road, Malahide, Co. Dublin", page),
                    700_000,
                    650_000,
                ),
                fixtures::card(
                    &format!("{:02}/07/2023", page),
                    &format!("{} Seafield Avenue, Clontarf", page),
                    540_000,
                    560_000,
                ),
            ],
        );
    }
}

fn run_worker(pages_dir: &Path, output_file: &Path) -> std::process::Output {
    soldhist([
        "worker",
        "--worker-id",
        "2",
        "--start-page",
        "5",
        "--end-page",
        "10",
        "--output-file",
        output_file.to_str().unwrap(),
        "--fetcher",
        "directory",
        "--pages-dir",
        pages_dir.to_str().unwrap(),
        "--base-url",
        BASE_URL,
    ])
}

#[test]
fn test_worker_resumes_after_crash() {
    let dir = tempdir().unwrap();
    let complete_pages = dir.path().join("complete");
    let partial_pages = dir.path().join("partial");
    write_pages(&complete_pages, 5..=10);
    write_pages(&partial_pages, [5, 6, 7, 9, 10]);

    let uninterrupted = dir.path().join("uninterrupted.json");
    let output = run_worker(&complete_pages, &uninterrupted);
    assert!(output.status.success(), "{}", stderr_of(&output));

    // Page 8 cannot be loaded, so the first run stops after page 7
    let interrupted = dir.path().join("interrupted.json");
    let output = run_worker(&partial_pages, &interrupted);
    assert!(!output.status.success());
    let pages: Vec<u32> = records_in(&interrupted).iter().map(|r| r.page_number()).collect();
    assert_eq!(pages, vec![5, 5, 6, 6, 7, 7]);

    write_pages(&partial_pages, [8]);
    let output = run_worker(&partial_pages, &interrupted);
    assert!(output.status.success(), "{}", stderr_of(&output));

    assert_eq!(
        fs::read_to_string(&interrupted).unwrap(),
        fs::read_to_string(&uninterrupted).unwrap()
    );
}

#[test]
fn test_completed_worker_fetches_nothing() {
    let dir = tempdir().unwrap();
    let pages_dir = dir.path().join("pages");
    write_pages(&pages_dir, 5..=10);

    let output_file = dir.path().join("partition_2.json");
    let output = run_worker(&pages_dir, &output_file);
    assert!(output.status.success(), "{}", stderr_of(&output));
    let before = fs::read_to_string(&output_file).unwrap();

    // Without any saved pages a rerun can only succeed if it loads none
    fs::remove_dir_all(&pages_dir).unwrap();
    fs::create_dir_all(&pages_dir).unwrap();
    let output = run_worker(&pages_dir, &output_file);
    assert!(output.status.success(), "{}", stderr_of(&output));

    assert_eq!(fs::read_to_string(&output_file).unwrap(), before);
    assert_eq!(records_in(&output_file).len(), 12);
}

#[test]
fn test_inverted_range_fails() {
    let dir = tempdir().unwrap();
    let pages_dir = dir.path().join("pages");
    write_pages(&pages_dir, 1..=3);
    let output_file = dir.path().join("partition_1.json");

    let output = soldhist([
        "worker",
        "--worker-id",
        "1",
        "--start-page",
        "3",
        "--end-page",
        "1",
        "--output-file",
        output_file.to_str().unwrap(),
        "--fetcher",
        "directory",
        "--pages-dir",
        pages_dir.to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    assert!(!output_file.exists());
}
