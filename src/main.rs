use clap::{Args, Parser, Subcommand, ValueEnum};
use soldhist_core::export::export_csv;
use soldhist_core::{
    merge_partitions, FetcherKind, MergeOptions, PageUrls, PartitionPlan, Result, Settings, SoldError,
};
use soldhist_scrapers::{run_job, run_worker, FetcherFactory, JobOptions, WorkerAssignment, WorkerProgram};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::{info, info_span, Instrument};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a range of index pages with parallel worker processes
    #[command(about = "Scrape a range of index pages with parallel worker processes")]
    #[command(long_about = "Split the index pages into contiguous partitions, run one worker process per partition and merge their output into a single file sorted by sold date.")]
    Scrape(ScrapeCommand),

    /// Scrape one partition (normally started by `scrape`)
    #[command(about = "Scrape one partition of index pages")]
    #[command(long_about = "Scrape one contiguous range of index pages into a checkpoint file. A rerun resumes after the last page found in the file.")]
    Worker(WorkerCommand),

    /// Merge partition files into one list
    #[command(about = "Merge partition files into one list")]
    Merge(MergeCommand),

    /// Export scraped records to CSV
    #[command(about = "Export scraped records to CSV")]
    #[command(long_about = "Export a JSON list of scraped records to a CSV file for external analysis.")]
    Export(ExportCommand),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFetcher {
    Chrome,
    Http,
    Directory,
}

impl From<CliFetcher> for FetcherKind {
    fn from(value: CliFetcher) -> Self {
        match value {
            CliFetcher::Chrome => FetcherKind::Chrome,
            CliFetcher::Http => FetcherKind::Http,
            CliFetcher::Directory => FetcherKind::Directory,
        }
    }
}

/// Options shared by `scrape` and `worker`. `scrape` forwards them to every
/// worker it starts.
#[derive(Args, Debug, Clone)]
struct FetchArgs {
    /// Settings file (-C, --config)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// The page fetcher to use (-x, --fetcher)
    #[arg(short = 'x', long, value_enum)]
    fetcher: Option<CliFetcher>,

    /// Directory of saved page-<n>.html files, for the directory fetcher
    #[arg(long)]
    pages_dir: Option<PathBuf>,

    /// URL of the first index page (-u, --base-url)
    #[arg(short = 'u', long)]
    base_url: Option<Url>,
}

impl FetchArgs {
    fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(fetcher) = self.fetcher {
            settings.fetcher = fetcher.into();
        }
        if let Some(dir) = &self.pages_dir {
            settings.pages_dir = Some(dir.clone());
        }
        if let Some(url) = &self.base_url {
            settings.base_url = url.clone();
        }
        settings.validate()?;
        Ok(settings)
    }

    fn forwarded(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        if let Some(config) = &self.config {
            args.push("--config".into());
            args.push(config.clone().into_os_string());
        }
        if let Some(fetcher) = self.fetcher {
            args.push("--fetcher".into());
            args.push(FetcherKind::from(fetcher).to_string().into());
        }
        if let Some(dir) = &self.pages_dir {
            args.push("--pages-dir".into());
            args.push(dir.clone().into_os_string());
        }
        if let Some(url) = &self.base_url {
            args.push("--base-url".into());
            args.push(url.as_str().into());
        }
        args
    }
}

#[derive(Parser)]
#[command(about = "Scrape a range of index pages")]
struct ScrapeCommand {
    /// Number of index pages to scrape, starting at page 1 (-n, --total-pages)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
    total_pages: u32,

    /// Number of worker processes (-w, --workers)
    #[arg(short = 'w', long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..))]
    workers: u32,

    /// Directory for partition files (-d, --output-dir)
    #[arg(short = 'd', long, default_value = "data")]
    output_dir: PathBuf,

    /// Merged output file, defaults to <output-dir>/sold_listings.json (-o, --output)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Delete partition files of successful workers after merging
    #[arg(long)]
    cleanup: bool,

    /// Keep records that share address, sold date and sold price
    #[arg(long)]
    keep_duplicates: bool,

    /// Exit with an error when any worker failed
    #[arg(long)]
    strict: bool,

    #[command(flatten)]
    fetch: FetchArgs,
}

#[derive(Parser)]
#[command(about = "Scrape one partition of index pages")]
struct WorkerCommand {
    /// Partition id, used in log lines (-i, --worker-id)
    #[arg(short = 'i', long)]
    worker_id: u32,

    /// First page of the partition (-s, --start-page)
    #[arg(short = 's', long)]
    start_page: u32,

    /// Last page of the partition, inclusive (-e, --end-page)
    #[arg(short = 'e', long)]
    end_page: u32,

    /// Checkpoint file for this partition (-o, --output-file)
    #[arg(short = 'o', long)]
    output_file: PathBuf,

    #[command(flatten)]
    fetch: FetchArgs,
}

#[derive(Parser)]
#[command(about = "Merge partition files into one list")]
struct MergeCommand {
    /// Output file path (-o, --output)
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// Keep records that share address, sold date and sold price
    #[arg(long)]
    keep_duplicates: bool,

    /// Partition files to merge
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Parser)]
#[command(about = "Export scraped records to CSV")]
struct ExportCommand {
    /// JSON file of scraped records (-i, --input)
    #[arg(short = 'i', long, default_value = "data/sold_listings.json")]
    input: PathBuf,

    /// Output file path (-o, --output)
    #[arg(short = 'o', long, default_value = "sold_listings.csv")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the report
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scrape(cmd) => {
            let settings = cmd.fetch.settings()?;
            info!("Using the {} fetcher on {}", settings.fetcher, settings.base_url);

            let plan = PartitionPlan::new(cmd.total_pages, cmd.workers, &cmd.output_dir)?;
            let output = cmd
                .output
                .clone()
                .unwrap_or_else(|| cmd.output_dir.join("sold_listings.json"));
            let program = WorkerProgram::current_exe(cmd.fetch.forwarded())?;
            let options = JobOptions {
                dedup: !cmd.keep_duplicates,
                cleanup: cmd.cleanup,
            };

            let report = run_job(&plan, &program, &output, options).await?;
            println!("{}", report.table());
            println!(
                "{} records written to {}",
                report.merge.records.len(),
                output.display()
            );

            let failed = report.failed();
            if !failed.is_empty() {
                println!(
                    "{} of {} workers failed; rerun the same command to resume them",
                    failed.len(),
                    report.outcomes.len()
                );
                if cmd.strict {
                    return Err(SoldError::Worker(format!(
                        "{} of {} workers failed",
                        failed.len(),
                        report.outcomes.len()
                    )));
                }
            }
        }
        Commands::Worker(cmd) => {
            let settings = cmd.fetch.settings()?;
            let urls = PageUrls::new(settings.base_url.clone())?;
            let assignment = WorkerAssignment {
                worker_id: cmd.worker_id,
                start_page: cmd.start_page,
                end_page: cmd.end_page,
                output_path: cmd.output_file,
            };

            async {
                let mut fetcher = FetcherFactory::create_fetcher(&settings).await?;
                run_worker(&assignment, fetcher.as_mut(), &urls).await
            }
            .instrument(info_span!("worker", id = cmd.worker_id))
            .await?;
        }
        Commands::Merge(cmd) => {
            let merged = merge_partitions(
                &cmd.inputs,
                MergeOptions {
                    dedup: !cmd.keep_duplicates,
                },
            );
            merged.write_to(&cmd.output)?;
            println!(
                "{} records from {} files written to {}",
                merged.records.len(),
                cmd.inputs.len(),
                cmd.output.display()
            );
        }
        Commands::Export(cmd) => {
            let count = export_csv(&cmd.input, &cmd.output)?;
            println!("{} records exported to {}", count, cmd.output.display());
        }
    }

    Ok(())
}
