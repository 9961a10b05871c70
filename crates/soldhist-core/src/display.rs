use colored::Colorize;
use tabled::settings::{object::Columns, Alignment, Modify, Style};
use tabled::{Table, Tabled};

#[derive(Tabled)]
pub struct PartitionRow {
    #[tabled(rename = "Partition")]
    pub partition: u32,
    #[tabled(rename = "Pages")]
    pub pages: String,
    #[tabled(rename = "Worker")]
    pub status: String,
    #[tabled(rename = "Records", display_with = "display_right_8")]
    pub records: usize,
}

fn display_right_8(n: &usize) -> String {
    format!("{:>8}", n)
}

impl PartitionRow {
    pub fn new(partition: u32, start_page: u32, end_page: u32, exit_code: Option<i32>, records: usize) -> Self {
        let status = match exit_code {
            Some(0) => "done".green().to_string(),
            Some(code) => format!("exit {}", code).red().to_string(),
            None => "aborted".red().to_string(),
        };

        Self {
            partition,
            pages: format!("{}-{}", start_page, end_page),
            status,
            records,
        }
    }
}

pub fn create_report_table(rows: &[PartitionRow]) -> String {
    let mut table = Table::new(rows);

    table
        .with(Style::modern())
        .with(Modify::new(Columns::single(0)).with(Alignment::right()))
        .with(Modify::new(Columns::single(1)).with(Alignment::right()));

    table.to_string()
}
