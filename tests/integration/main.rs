//! End-to-end tests that drive the `soldhist` binary against saved pages.

mod export;
mod pipeline;
mod resume;

use soldhist_core::checkpoint::read_records;
use soldhist_core::ScrapedListingRecord;
use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

pub const BASE_URL: &str = "https://example.com/sold";

/// Run the binary with warnings-only logging.
pub fn soldhist<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new(env!("CARGO_BIN_EXE_soldhist"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

/// Save an index page holding the given card texts, one line per element.
pub fn write_page(pages_dir: &Path, page: u32, cards: &[String]) {
    let mut html = String::from("<html><body><div class=\"results\">\n");
    for card in cards {
        html.push_str("<div class=\"PropertyListingCard\">");
        for line in card.lines() {
            html.push_str("<p>");
            html.push_str(line);
            html.push_str("</p>");
        }
        html.push_str("</div>\n");
    }
    html.push_str("</div></body></html>\n");

    fs::create_dir_all(pages_dir).unwrap();
    fs::write(pages_dir.join(format!("page-{}.html", page)), html).unwrap();
}

pub fn records_in(path: &Path) -> Vec<ScrapedListingRecord> {
    read_records(path).unwrap().unwrap()
}

pub fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
