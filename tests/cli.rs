use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

const BINARY: &str = "fastqc-summary";
type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A FastQC stand-in: logs the input it was given and writes a minimal report beside it.
fn fake_fastqc(log: &str) -> String {
    format!(
        r#"#!/bin/sh
echo "$1" >> '{log}'
name=$(basename "$1" .fastq.gz)
cat > "$(dirname "$1")/${{name}}_fastqc.html" <<EOF
<html><body><table>
<tr><td>Filename</td><td>$(basename "$1")</td></tr>
<tr><td>Total Bases</td><td>1000</td></tr>
<tr><td>%GC</td><td>50</td></tr>
</table></body></html>
EOF
"#
    )
}

/// A MultiQC stand-in which only logs the directory it was given.
fn fake_multiqc(log: &str) -> String {
    format!("#!/bin/sh\necho \"$1\" >> '{log}'\n")
}

/// Sets up a working directory with two inputs, one of which already has a report that is
/// missing its %GC row. Returns the directory and the shell commands for the two tools.
fn workspace() -> Result<(TempDir, TempDir, String, String), Box<dyn std::error::Error>> {
    let work = TempDir::new()?;
    let tools = TempDir::new()?;

    work.child("a.fastq.gz").touch()?;
    work.child("b.fastq.gz").touch()?;
    work.child("notes.txt").touch()?;
    work.child("b_fastqc.html").write_str(
        "<html><body><table>
        <tr><td>Filename</td><td>b.fastq.gz</td></tr>
        <tr><td>Total Bases</td><td>2100000000</td></tr>
        </table></body></html>",
    )?;

    let fastqc_log = tools.child("fastqc.log");
    let multiqc_log = tools.child("multiqc.log");
    let fastqc = tools.child("fastqc.sh");
    let multiqc = tools.child("multiqc.sh");
    fastqc.write_str(&fake_fastqc(fastqc_log.path().to_str().unwrap()))?;
    multiqc.write_str(&fake_multiqc(multiqc_log.path().to_str().unwrap()))?;

    let fastqc_cmd = format!("sh {}", fastqc.path().display());
    let multiqc_cmd = format!("sh {}", multiqc.path().display());
    Ok((work, tools, fastqc_cmd, multiqc_cmd))
}

fn log_lines(tools: &TempDir, name: &str) -> Vec<String> {
    std::fs::read_to_string(tools.child(name).path())
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn full_pipeline_with_defaults() -> TestResult {
    let (work, tools, fastqc, multiqc) = workspace()?;

    Command::cargo_bin(BINARY)?
        .current_dir(work.path())
        .env("RUST_LOG", "info")
        .args(["--fastqc", &fastqc, "--multiqc", &multiqc])
        .assert()
        .success()
        .stderr(predicate::str::contains("Skipping FastQC step"))
        .stderr(predicate::str::contains("Summary saved to fastqc_summary.csv"));

    assert_eq!(log_lines(&tools, "fastqc.log"), ["./a.fastq.gz"]);
    assert_eq!(log_lines(&tools, "multiqc.log"), ["./"]);

    work.child("fastqc_summary.csv").assert(
        "Filename,Total Bases,%GC\n\
         a.fastq.gz,1000,50\n\
         b.fastq.gz,2100000000,N/A\n",
    );

    Ok(())
}

#[test]
fn rerun_does_not_repeat_fastqc() -> TestResult {
    let (work, tools, fastqc, multiqc) = workspace()?;

    for _ in 0..2 {
        Command::cargo_bin(BINARY)?
            .current_dir(work.path())
            .args(["run", "--fastqc", &fastqc, "--multiqc", &multiqc])
            .assert()
            .success();
    }

    assert_eq!(log_lines(&tools, "fastqc.log").len(), 1);
    assert_eq!(log_lines(&tools, "multiqc.log").len(), 2);

    Ok(())
}

#[test]
fn missing_tools_are_not_fatal() -> TestResult {
    let work = TempDir::new()?;
    work.child("a.fastq.gz").touch()?;

    Command::cargo_bin(BINARY)?
        .current_dir(work.path())
        .env("RUST_LOG", "info")
        .args([
            "--fastqc",
            "/nonexistent/fastqc",
            "--multiqc",
            "/nonexistent/multiqc",
            "--threads",
            "2",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("return code 127"));

    work.child("fastqc_summary.csv")
        .assert("Filename,Total Bases,%GC\n");

    Ok(())
}

#[test]
fn scrape_only_with_explicit_paths() -> TestResult {
    let (work, tools, _, _) = workspace()?;
    let out = work.child("out/summary.csv");
    std::fs::create_dir(work.child("out").path())?;

    Command::cargo_bin(BINARY)?
        .args(["scrape", "--dir", work.path().to_str().unwrap()])
        .args(["-o", out.path().to_str().unwrap()])
        .assert()
        .success();

    out.assert("Filename,Total Bases,%GC\nb.fastq.gz,2100000000,N/A\n");
    assert!(log_lines(&tools, "fastqc.log").is_empty());

    Ok(())
}

#[test]
fn malformed_report_aborts() -> TestResult {
    let work = TempDir::new()?;
    work.child("broken_fastqc.html")
        .write_str("<table><tr><td>Filename</td><td>x.fastq.gz</td></tr><tr><td>%GC</td></tr></table>")?;

    Command::cargo_bin(BINARY)?
        .current_dir(work.path())
        .arg("scrape")
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken_fastqc.html"))
        .stderr(predicate::str::contains("has no value cell"));

    work.child("fastqc_summary.csv")
        .assert(predicate::path::missing());

    Ok(())
}

#[test]
fn zero_threads_is_rejected() -> TestResult {
    Command::cargo_bin(BINARY)?
        .args(["--threads", "0"])
        .assert()
        .failure();

    Ok(())
}
