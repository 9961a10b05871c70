//! Job orchestration: one worker process per partition, then the merge.
//!
//! Workers run as separate OS processes because each owns a browser that
//! cannot be shared. The orchestrator only looks at their exit codes and,
//! once every worker has exited, their output files.

use futures::future::join_all;
use soldhist_core::{
    create_report_table, merge_partitions, MergeOptions, MergeOutcome, Partition, PartitionPlan,
    PartitionRow, Result,
};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{info, warn};

/// How to start a worker process.
///
/// The command line is `program <leading_args> worker --worker-id <id>
/// --start-page <n> --end-page <n> --output-file <path> <trailing_args>`.
#[derive(Debug, Clone)]
pub struct WorkerProgram {
    pub program: PathBuf,
    pub leading_args: Vec<OsString>,
    pub trailing_args: Vec<OsString>,
}

impl WorkerProgram {
    /// Re-invoke the running executable, forwarding `trailing_args`.
    pub fn current_exe(trailing_args: Vec<OsString>) -> Result<Self> {
        Ok(Self {
            program: std::env::current_exe()?,
            leading_args: Vec::new(),
            trailing_args,
        })
    }

    pub fn command(&self, partition: &Partition) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .arg("worker")
            .arg("--worker-id")
            .arg(partition.id.to_string())
            .arg("--start-page")
            .arg(partition.start_page.to_string())
            .arg("--end-page")
            .arg(partition.end_page.to_string())
            .arg("--output-file")
            .arg(&partition.output_path)
            .args(&self.trailing_args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOptions {
    pub dedup: bool,
    /// Delete the files of successful partitions after merging.
    pub cleanup: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self { dedup: true, cleanup: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionOutcome {
    pub partition: Partition,
    /// `None` when the worker never started or was killed by a signal.
    pub exit_code: Option<i32>,
}

impl PartitionOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug)]
pub struct JobReport {
    pub outcomes: Vec<PartitionOutcome>,
    pub merge: MergeOutcome,
    pub output_path: PathBuf,
}

impl JobReport {
    pub fn failed(&self) -> Vec<&PartitionOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded()).collect()
    }

    pub fn table(&self) -> String {
        let rows: Vec<PartitionRow> = self
            .outcomes
            .iter()
            .map(|outcome| {
                let records = self
                    .merge
                    .per_source
                    .iter()
                    .find(|(path, _)| *path == outcome.partition.output_path)
                    .map(|(_, count)| *count)
                    .unwrap_or(0);
                PartitionRow::new(
                    outcome.partition.id,
                    outcome.partition.start_page,
                    outcome.partition.end_page,
                    outcome.exit_code,
                    records,
                )
            })
            .collect();
        create_report_table(&rows)
    }
}

/// Start every worker, then wait for all of them. Spawning never waits on
/// an earlier worker, and a failed worker never stops the others.
pub async fn run_workers(plan: &PartitionPlan, program: &WorkerProgram) -> Result<Vec<PartitionOutcome>> {
    for partition in &plan.partitions {
        if let Some(parent) = partition.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
    }

    let mut running: Vec<(Partition, Option<Child>)> = Vec::with_capacity(plan.len());
    for partition in &plan.partitions {
        match program.command(partition).spawn() {
            Ok(child) => {
                info!(
                    "Started worker {} for pages {}-{} (pid {:?})",
                    partition.id,
                    partition.start_page,
                    partition.end_page,
                    child.id()
                );
                running.push((partition.clone(), Some(child)));
            }
            Err(e) => {
                warn!("Failed to start worker {}: {}", partition.id, e);
                running.push((partition.clone(), None));
            }
        }
    }

    let waits = running.into_iter().map(|(partition, child)| async move {
        let exit_code = match child {
            Some(mut child) => match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    warn!("Lost track of worker {}: {}", partition.id, e);
                    None
                }
            },
            None => None,
        };
        PartitionOutcome { partition, exit_code }
    });

    Ok(join_all(waits).await)
}

/// Run a whole job: all workers, then the merge into `output_path`.
///
/// Worker failures are reported but do not fail the job; every partition
/// file, complete or partial, is merged. Only a failure to write the merged
/// file is an error.
pub async fn run_job(
    plan: &PartitionPlan,
    program: &WorkerProgram,
    output_path: &Path,
    options: JobOptions,
) -> Result<JobReport> {
    info!(
        "Scraping {} pages with {} workers",
        plan.total_pages,
        plan.len()
    );
    let outcomes = run_workers(plan, program).await?;

    for outcome in outcomes.iter().filter(|o| !o.succeeded()) {
        match outcome.exit_code {
            Some(code) => warn!("Worker {} exited with code {}", outcome.partition.id, code),
            None => warn!("Worker {} did not exit normally", outcome.partition.id),
        }
    }

    let merge = merge_partitions(&plan.output_paths(), MergeOptions { dedup: options.dedup });
    merge.write_to(output_path)?;

    if options.cleanup {
        remove_partition_files(&outcomes);
    }

    Ok(JobReport {
        outcomes,
        merge,
        output_path: output_path.to_path_buf(),
    })
}

/// Delete the files of partitions whose worker finished. Files of failed
/// partitions stay so that a rerun can resume them.
fn remove_partition_files(outcomes: &[PartitionOutcome]) {
    for outcome in outcomes {
        let path = &outcome.partition.output_path;
        if !outcome.succeeded() {
            info!("Keeping {} for resumption", path.display());
            continue;
        }
        match std::fs::remove_file(path) {
            Ok(()) => info!("Removed {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {}", path.display(), e),
        }
    }
}
