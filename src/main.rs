extern crate env_logger;
#[macro_use]
extern crate log;
use std::path::Path;

use anyhow::Result;
use clap::Parser;

mod cli;
mod command;
mod dispatch;
mod scrape;

use cli::{Cli, Commands};
use command::ShellRunner;
use dispatch::{BatchSummary, Tools};

/// Runs FastQC over the directory (skipping files which already have a report), followed
/// by a single MultiQC run.
fn run_qc_stage(cli: &Cli) -> Result<BatchSummary> {
    info!("Running FastQC and MultiQC...");

    let tools = Tools {
        qc: &cli.fastqc,
        aggregate: &cli.multiqc,
    };
    dispatch::run_batch(
        &ShellRunner,
        Path::new(&cli.dir),
        &tools,
        usize::from(cli.threads),
    )
}

/// Parses every FastQC report in the directory and writes the summary .csv.
fn run_scrape_stage(cli: &Cli) -> Result<()> {
    info!("Parsing FastQC HTML files...");

    let rows = scrape::scrape_reports(Path::new(&cli.dir))?;
    scrape::write_summary(&cli.output, &rows)?;

    info!("Summary saved to {}", cli.output);
    Ok(())
}

fn try_main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    let cli = Cli::parse();

    info!("fastqc-summary v{}", cli::VERSION);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let batch = run_qc_stage(&cli)?;
            run_scrape_stage(&cli)?;

            info!("{}", indoc::formatdoc! {"
                Completed.
                  inputs:  {}
                  FastQC:  {} run, {} skipped, {} failed",
                batch.inputs, batch.invoked, batch.skipped, batch.failed
            });
        }
        Commands::Qc => {
            run_qc_stage(&cli)?;
        }
        Commands::Scrape => {
            run_scrape_stage(&cli)?;
        }
    };
    Ok(())
}

fn main() {
    if let Err(err) = try_main() {
        error!("{}", err);

        // report any errors that are produced
        err.chain()
            .skip(1)
            .for_each(|cause| error!("  because: {}", cause));

        std::process::exit(1);
    }
}
