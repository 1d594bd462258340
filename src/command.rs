use std::io::{BufRead, BufReader, Read};
use std::process::{Command, ExitStatus, Stdio};

use anyhow::{anyhow, Context, Result};

/// How a shell command finished. This is only ever logged or counted; a failed command
/// never stops the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    /// Nonzero exit. The code is `None` when the child was killed by a signal.
    Failed(Option<i32>),
    /// The shell itself could not be started.
    SpawnFailed(String),
}

impl CommandStatus {
    pub fn success(&self) -> bool {
        matches!(self, CommandStatus::Success)
    }
}

/// Something which can execute a shell command string. Implementations must be usable
/// from several pool workers at once.
pub trait CommandRunner: Sync {
    fn run(&self, command: &str) -> CommandStatus;
}

/// Runs commands through `sh -c`, relaying the child's output to the console line by line
/// as it is produced.
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str) -> CommandStatus {
        info!("Running command: {command}");

        let status = match spawn_and_relay(command) {
            Ok(status) => status,
            Err(e) => {
                error!("Could not run `{command}`: {e:#}");
                return CommandStatus::SpawnFailed(format!("{e:#}"));
            }
        };

        if status.success() {
            info!("Command completed successfully!");
            CommandStatus::Success
        } else {
            match status.code() {
                Some(code) => error!("Command failed with return code {code}: {command}"),
                None => error!("Command was terminated by a signal: {command}"),
            }
            CommandStatus::Failed(status.code())
        }
    }
}

/// Spawns `sh -c <command>` and blocks until it exits. stdout and stderr are drained on
/// two scoped threads so that neither pipe can fill up and stall the child.
fn spawn_and_relay(command: &str) -> Result<ExitStatus> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("Unable to spawn `sh`")?;

    let stdout = child.stdout.take().context("Child stdout was not captured")?;
    let stderr = child.stderr.take().context("Child stderr was not captured")?;

    crossbeam::thread::scope(|scope| {
        scope.spawn(move |_| relay_lines(stdout, |line| println!("{line}")));
        scope.spawn(move |_| relay_lines(stderr, |line| eprintln!("{line}")));
    })
    .map_err(|_| anyhow!("Output relay thread panicked"))?;

    child
        .wait()
        .with_context(|| format!("Failed while waiting for `{command}`"))
}

/// Reads `source` until EOF, handing each line (without its terminator) to `emit`.
/// Lines which are not valid UTF-8 are converted lossily.
fn relay_lines(source: impl Read, mut emit: impl FnMut(&str)) {
    let mut reader = BufReader::new(source);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                emit(line.trim_end_matches(['\n', '\r']));
            }
            Err(e) => {
                warn!("Stopped relaying child output: {e}");
                break;
            }
        }
    }
}

/// Wraps `s` in single quotes so it reaches the child as one word, whatever it contains.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
