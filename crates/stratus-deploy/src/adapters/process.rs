//! Child-process helpers shared by the CLI-backed adapters.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use stratus_common::error::{Result, StratusError};

use crate::cancel::CancelToken;

const POLL_INTERVAL_MS: u64 = 100;

/// Finds `binary` on `PATH`, or accepts it as given if it is a path.
///
/// # Errors
///
/// Returns an external-tool error naming the binary when it cannot be found.
pub fn locate(tool: &str, binary: &str) -> Result<PathBuf> {
    which::which(binary).map_err(|_| StratusError::tool(tool, format!("'{binary}' not found on PATH")))
}

/// Runs a command to completion, forwarding its output to the log line by
/// line, and kills it if `cancel` fires.
///
/// # Errors
///
/// Returns an external-tool error on spawn failure or non-zero exit, and
/// [`StratusError::Cancelled`] if cancelled.
pub fn run_streaming(tool: &str, mut command: Command, cancel: &CancelToken) -> Result<()> {
    tracing::debug!(tool, command = ?command, "spawning");
    let mut child = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| StratusError::tool(tool, format!("cannot start: {e}")))?;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    std::thread::scope(|scope| {
        let _ = scope.spawn(|| forward_lines(tool, stdout));
        let last_error = scope.spawn(|| forward_lines(tool, stderr));

        let status = loop {
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(tool, "process killed on cancellation");
                return Err(StratusError::Cancelled);
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => std::thread::sleep(Duration::from_millis(POLL_INTERVAL_MS)),
                Err(e) => return Err(StratusError::tool(tool, format!("cannot wait: {e}"))),
            }
        };
        if status.success() {
            return Ok(());
        }
        let detail = last_error.join().ok().flatten().unwrap_or_default();
        Err(StratusError::tool(tool, format!("exited with {status}: {detail}")))
    })
}

/// Forwards each line to the log; returns the last one.
fn forward_lines(tool: &str, stream: Option<impl Read>) -> Option<String> {
    let mut last = None;
    for line in BufReader::new(stream?).lines().map_while(std::result::Result::ok) {
        tracing::info!(tool, "{line}");
        last = Some(line);
    }
    last
}

/// Runs a command and returns its standard output.
///
/// # Errors
///
/// Returns an external-tool error carrying stderr on non-zero exit.
pub fn run_captured(tool: &str, command: Command) -> Result<String> {
    run_with_input(tool, command, None)
}

/// Runs a command with `input` written to its standard input.
///
/// # Errors
///
/// Returns an external-tool error carrying stderr on non-zero exit.
pub fn run_with_input(tool: &str, mut command: Command, input: Option<&str>) -> Result<String> {
    tracing::debug!(tool, command = ?command, "running");
    let mut child = command
        .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| StratusError::tool(tool, format!("cannot start: {e}")))?;
    if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
        stdin
            .write_all(input.as_bytes())
            .map_err(|e| StratusError::tool(tool, format!("cannot write input: {e}")))?;
    }
    let output = child
        .wait_with_output()
        .map_err(|e| StratusError::tool(tool, format!("cannot wait: {e}")))?;
    if !output.status.success() {
        return Err(StratusError::tool(
            tool,
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// A command rooted at `dir`.
pub fn command_in(binary: &Path, dir: &Path) -> Command {
    let mut command = Command::new(binary);
    let _ = command.current_dir(dir);
    command
}
