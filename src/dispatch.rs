use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::command::{shell_quote, CommandRunner, CommandStatus};

pub const INPUT_SUFFIX: &str = ".fastq.gz";
pub const REPORT_SUFFIX: &str = "_fastqc.html";

/// FastQC is always given a single thread; parallelism comes from the pool instead.
const THREADS_PER_FILE: usize = 1;

/// The external programs to invoke. Each is inserted verbatim at the start of a shell
/// command.
pub struct Tools<'a> {
    pub qc: &'a str,
    pub aggregate: &'a str,
}

/// Counts collected over one batch, for logging.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub inputs: usize,
    pub invoked: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// The name FastQC gives the HTML report for `input`, e.g.
/// `S1_R1.fastq.gz` -> `S1_R1_fastqc.html`.
pub fn report_name(input: &str) -> String {
    input.replace(INPUT_SUFFIX, REPORT_SUFFIX)
}

/// Lists the names of all regular files in `dir` whose name ends with `suffix`, sorted.
/// Symlinks are followed.
pub fn list_files_with_suffix(dir: &Path, suffix: &str) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Unable to list directory {}", dir.display()))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Unable to list directory {}", dir.display()))?;

        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            warn!("Ignoring non UTF-8 file name {:?}", entry.file_name());
            continue;
        };

        if name.ends_with(suffix) && entry.path().is_file() {
            names.push(name);
        }
    }

    names.sort();
    Ok(names)
}

/// Lists the `.fastq.gz` inputs in `dir`.
pub fn list_inputs(dir: &Path) -> Result<Vec<String>> {
    list_files_with_suffix(dir, INPUT_SUFFIX)
}

/// Runs the QC tool on a single input, unless its report already exists in `dir`.
///
/// # Returns
///
/// `None` if the input was skipped, otherwise the status of the QC command.
pub fn run_qc(
    runner: &impl CommandRunner,
    dir: &Path,
    input: &str,
    qc_tool: &str,
    threads: usize,
) -> Option<CommandStatus> {
    let report = report_name(input);

    if dir.join(&report).exists() {
        info!("FastQC HTML file for {input} already exists. Skipping FastQC step.");
        return None;
    }

    let path = dir.join(input);
    let command = format!(
        "{qc_tool} {} -t {threads}",
        shell_quote(&path.to_string_lossy())
    );
    Some(runner.run(&command))
}

/// Runs the QC tool over every input in `dir` using a pool of `width` workers, then runs
/// the aggregation tool once over the whole directory.
///
/// A failed QC job is logged and counted but never stops the batch, and aggregation runs
/// regardless of how the jobs went.
///
/// # Errors
///
/// Returns an error if `dir` cannot be listed or the worker pool cannot be created.
pub fn run_batch(
    runner: &impl CommandRunner,
    dir: &Path,
    tools: &Tools,
    width: usize,
) -> Result<BatchSummary> {
    let inputs = list_inputs(dir)?;
    info!(
        "Found {} {INPUT_SUFFIX} file(s) in {}, running with {width} worker(s)",
        inputs.len(),
        dir.display()
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(width)
        .build()
        .context("Unable to create the FastQC worker pool")?;

    let skipped = AtomicUsize::new(0);
    let invoked = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    pool.install(|| {
        inputs.par_iter().for_each(|input| {
            match run_qc(runner, dir, input, tools.qc, THREADS_PER_FILE) {
                None => {
                    skipped.fetch_add(1, Ordering::Relaxed);
                }
                Some(status) => {
                    invoked.fetch_add(1, Ordering::Relaxed);
                    if !status.success() {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        })
    });

    let summary = BatchSummary {
        inputs: inputs.len(),
        invoked: invoked.into_inner(),
        skipped: skipped.into_inner(),
        failed: failed.into_inner(),
    };

    if summary.failed > 0 {
        warn!(
            "{} of {} FastQC run(s) did not succeed",
            summary.failed, summary.invoked
        );
    }
    info!(
        "FastQC finished: {} run, {} skipped",
        summary.invoked, summary.skipped
    );

    aggregate(runner, dir, tools.aggregate);

    Ok(summary)
}

/// Runs the aggregation tool once over `dir`.
pub fn aggregate(runner: &impl CommandRunner, dir: &Path, aggregate_tool: &str) -> CommandStatus {
    let command = format!(
        "{aggregate_tool} {}",
        shell_quote(&dir.to_string_lossy())
    );
    runner.run(&command)
}
