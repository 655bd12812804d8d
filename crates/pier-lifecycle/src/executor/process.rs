//! Child process plumbing shared by the executors

use crate::error::{LifecycleError, Result};
use serde::Serialize;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Which stream a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Receives pier output one line at a time
pub trait OutputSink: Send + Sync {
    fn line(&self, stream: OutputStream, line: &str);
}

/// Sink forwarding lines to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn line(&self, stream: OutputStream, line: &str) {
        match stream {
            OutputStream::Stdout => info!(target: "pier", "{}", line),
            OutputStream::Stderr => warn!(target: "pier", "{}", line),
        }
    }
}

/// Captured output of a finished relay command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Replay captured output into a sink
    pub fn replay(&self, sink: &dyn OutputSink) {
        for line in self.stdout.lines() {
            sink.line(OutputStream::Stdout, line);
        }
        for line in self.stderr.lines() {
            sink.line(OutputStream::Stderr, line);
        }
    }

    /// Most useful single line for an error message
    pub fn summary(&self) -> String {
        let pick = |s: &str| s.lines().rev().find(|l| !l.trim().is_empty()).map(str::to_string);
        pick(&self.stderr)
            .or_else(|| pick(&self.stdout))
            .unwrap_or_else(|| format!("exit code {:?}", self.code))
    }
}

/// Run `cmd` to completion, capturing output, bounded by `timeout`.
///
/// The child is killed if the timeout elapses.
pub(crate) async fn run_captured(
    mut cmd: Command,
    timeout: Duration,
    what: &str,
) -> Result<ProcessOutput> {
    cmd.kill_on_drop(true);
    debug!(command = ?cmd.as_std(), "Running");

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| LifecycleError::Process(format!("{} timed out after {:?}", what, timeout)))?
        .map_err(|e| LifecycleError::Process(format!("{} could not be run: {}", what, e)))?;

    Ok(ProcessOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
