use clap::builder::styling::AnsiColor;
use clap::builder::Styles;
use clap::{Parser, Subcommand};

const fn extra_build_info() -> &'static str {
    match option_env!("CARGO_BUILD_DESC") {
        Some(e) => e,
        None => env!("CARGO_PKG_VERSION"),
    }
}
pub const VERSION: &str = extra_build_info();
const INFO_STRING: &str = "
🧪 fastqc-summary version ";
const AFTER_STRING: &str = "
   ──────────────────────────────────
   batch FastQC + MultiQC, then a CSV of filename, total bases and %GC";

// colouring of the help
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().bold())
    .usage(AnsiColor::BrightMagenta.on_default().bold())
    .literal(AnsiColor::BrightMagenta.on_default())
    .placeholder(AnsiColor::White.on_default());

/// With no subcommand the full pipeline runs, using the defaults below.
#[derive(Parser)]
#[command(
    version = VERSION,
    about = format!("{}{}{}", INFO_STRING, VERSION, AFTER_STRING),
    styles = STYLES
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// the directory holding the .fastq.gz files and their reports
    #[arg(global = true, long, default_value = "./")]
    pub dir: String,

    /// the summary .csv to write
    #[arg(global = true, short, long, default_value = "fastqc_summary.csv")]
    pub output: String,

    /// the number of FastQC processes to run at once
    #[arg(
        global = true,
        short,
        long,
        default_value_t = 10,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub threads: u16,

    /// the per-file QC command. this is placed into a shell command as-is, so
    /// extra words are allowed, e.g.
    ///     --fastqc "singularity exec fastqc.sif fastqc"
    #[arg(
        global = true,
        long,
        env = "FASTQC_PATH",
        default_value = "fastqc",
        verbatim_doc_comment
    )]
    pub fastqc: String,

    /// the aggregation command, run once over --dir
    #[arg(global = true, long, env = "MULTIQC_PATH", default_value = "multiqc")]
    pub multiqc: String,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq, Debug)]
pub enum Commands {
    /// Run FastQC on every .fastq.gz, MultiQC over the directory, then write the summary
    Run,

    /// Only run FastQC and MultiQC. Files which already have a report are skipped
    Qc,

    /// Only parse existing *_fastqc.html reports into the summary .csv
    Scrape,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_uses_defaults() {
        let cli = Cli::parse_from(["fastqc-summary"]);
        assert_eq!(cli.command, None);
        assert_eq!(cli.dir, "./");
        assert_eq!(cli.output, "fastqc_summary.csv");
        assert_eq!(cli.threads, 10);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["fastqc-summary", "scrape", "--dir", "reads", "-t", "3"]);
        assert_eq!(cli.command, Some(Commands::Scrape));
        assert_eq!(cli.dir, "reads");
        assert_eq!(cli.threads, 3);
    }

    #[test]
    fn zero_threads_rejected() {
        assert!(Cli::try_parse_from(["fastqc-summary", "--threads", "0"]).is_err());
    }
}
