//! Local binary execution
//!
//! pier runs from its artifact directory with `LD_LIBRARY_PATH` pointing at
//! the same directory so it finds libwasmer. Attached runs stream output to
//! a sink; detached runs append to `<instanceRepo>/pier.log`.

use super::process::{run_captured, OutputSink, OutputStream, ProcessOutput};
use super::relay::{relay_args, start_args, RelayCommand};
use super::{DeploymentExecutor, Invocation, Started, StopOutcome};
use crate::error::{LifecycleError, Result};
use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use pier_artifacts::ArtifactLocation;
use pier_types::{InstanceRecord, PierInstance};
use std::ffi::OsString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

const LOG_FILE: &str = "pier.log";
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs pier as a local child process
pub struct BinaryExecutor {
    sink: Arc<dyn OutputSink>,
    attach: bool,
    stop_timeout: Duration,
    command_timeout: Duration,
}

impl BinaryExecutor {
    pub fn new(sink: Arc<dyn OutputSink>) -> Self {
        Self {
            sink,
            attach: true,
            stop_timeout: super::DEFAULT_STOP_TIMEOUT,
            command_timeout: super::DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Keep pier's output attached to this invocation
    pub fn with_attach(mut self, attach: bool) -> Self {
        self.attach = attach;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    fn pier_command(binary: &ArtifactLocation, args: Vec<OsString>) -> Command {
        let mut cmd = Command::new(&binary.path);
        cmd.args(args)
            .env("LD_LIBRARY_PATH", library_path(&binary.root))
            .stdin(Stdio::null());
        cmd
    }

    async fn relay(&self, invocation: Invocation<'_>, command: RelayCommand<'_>) -> Result<ProcessOutput> {
        let binary = require_binary(invocation)?;
        let args = relay_args(
            &invocation.instance.instance_repo,
            command,
            invocation.schema,
            invocation.method,
        );
        let cmd = Self::pier_command(binary, args);
        let output = run_captured(cmd, self.command_timeout, "pier").await?;
        output.replay(self.sink.as_ref());
        if !output.success() {
            return Err(LifecycleError::Process(format!(
                "pier exited with {:?}: {}",
                output.code,
                output.summary()
            )));
        }
        Ok(output)
    }
}

fn require_binary<'a>(invocation: Invocation<'a>) -> Result<&'a ArtifactLocation> {
    invocation
        .binary
        .ok_or_else(|| LifecycleError::MissingArtifact(invocation.instance.instance_repo.clone()))
}

/// Artifact root prepended to any inherited `LD_LIBRARY_PATH`
fn library_path(root: &Path) -> OsString {
    let mut value = OsString::from(root);
    if let Some(existing) = std::env::var_os("LD_LIBRARY_PATH").filter(|v| !v.is_empty()) {
        value.push(":");
        value.push(existing);
    }
    value
}

#[async_trait]
impl DeploymentExecutor for BinaryExecutor {
    #[instrument(skip_all, fields(chain = %invocation.instance.chain_type))]
    async fn start(&self, invocation: Invocation<'_>, config: &Path) -> Result<Started> {
        let binary = require_binary(invocation)?;
        let repo = &invocation.instance.instance_repo;
        let mut cmd = Self::pier_command(binary, start_args(repo, config));

        if self.attach {
            cmd.stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
        } else {
            let log = repo.join(LOG_FILE);
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log)
                .map_err(|e| LifecycleError::io(&log, e))?;
            let err_file = file.try_clone().map_err(|e| LifecycleError::io(&log, e))?;
            cmd.stdout(Stdio::from(file)).stderr(Stdio::from(err_file));
        }

        let child = cmd
            .spawn()
            .map_err(|e| LifecycleError::Process(format!("failed to spawn {}: {}", binary.path.display(), e)))?;
        let pid = child.id();
        info!(pid, attach = self.attach, "pier started");

        let process = self.attach.then(|| PierProcess {
            child,
            sink: self.sink.clone(),
        });
        Ok(Started { pid, process })
    }

    async fn register(&self, invocation: Invocation<'_>) -> Result<ProcessOutput> {
        self.relay(invocation, RelayCommand::Register).await
    }

    async fn deploy_rule(&self, invocation: Invocation<'_>, rule: &Path) -> Result<ProcessOutput> {
        self.relay(invocation, RelayCommand::DeployRule { rule }).await
    }

    #[instrument(skip_all, fields(chain = %instance.chain_type))]
    async fn stop(
        &self,
        instance: &PierInstance,
        record: Option<&InstanceRecord>,
    ) -> Result<StopOutcome> {
        let Some(pid) = record.and_then(|r| r.pid) else {
            debug!("No recorded pid");
            return Ok(StopOutcome::NotRunning);
        };
        match serves_instance(pid, &instance.instance_repo) {
            Some(true) => {}
            Some(false) => {
                warn!(pid, "Recorded pid is not this instance's pier; leaving it alone");
                return Ok(StopOutcome::NotRunning);
            }
            None => debug!(pid, "No /proc to confirm the recorded pid"),
        }
        terminate(pid, self.stop_timeout).await
    }
}

fn to_pid(pid: u32) -> Result<Pid> {
    i32::try_from(pid)
        .map(Pid::from_raw)
        .map_err(|_| LifecycleError::Process(format!("invalid pid {}", pid)))
}

fn is_alive(pid: Pid) -> bool {
    // EPERM still means the process exists
    !matches!(kill(pid, None), Err(Errno::ESRCH))
}

/// Whether a process with this pid exists
pub fn process_alive(pid: u32) -> bool {
    to_pid(pid).map(is_alive).unwrap_or(false)
}

/// Whether `pid` runs with `--repo <instance_repo>` on its command line.
///
/// Pids are reused once pier exits, so a recorded pid alone does not identify
/// it. `None` when the platform has no `/proc` to check against.
fn serves_instance(pid: u32, instance_repo: &Path) -> Option<bool> {
    let proc_root = Path::new("/proc");
    if !proc_root.join("self").exists() {
        return None;
    }
    let cmdline = match std::fs::read(proc_root.join(pid.to_string()).join("cmdline")) {
        Ok(cmdline) => cmdline,
        Err(_) => return Some(false),
    };
    let repo = instance_repo.as_os_str().as_bytes();
    let mut args = cmdline.split(|b| *b == 0);
    Some(args.any(|arg| arg == b"--repo") && args.next() == Some(repo))
}

/// SIGTERM, wait up to `grace`, then SIGKILL
pub(crate) async fn terminate(raw_pid: u32, grace: Duration) -> Result<StopOutcome> {
    let pid = to_pid(raw_pid)?;

    match kill(pid, Signal::SIGTERM) {
        Ok(()) => {}
        Err(Errno::ESRCH) => {
            debug!(pid = raw_pid, "Recorded process already gone");
            return Ok(StopOutcome::NotRunning);
        }
        Err(e) => return Err(LifecycleError::Process(format!("SIGTERM {}: {}", raw_pid, e))),
    }

    let deadline = Instant::now() + grace;
    while Instant::now() < deadline {
        if !is_alive(pid) {
            info!(pid = raw_pid, "pier terminated");
            return Ok(StopOutcome::Terminated { pid: raw_pid });
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    warn!(pid = raw_pid, ?grace, "pier ignored SIGTERM, sending SIGKILL");
    match kill(pid, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(StopOutcome::Killed { pid: raw_pid }),
        Err(e) => Err(LifecycleError::Process(format!("SIGKILL {}: {}", raw_pid, e))),
    }
}

/// An attached pier process
pub struct PierProcess {
    child: Child,
    sink: Arc<dyn OutputSink>,
}

impl std::fmt::Debug for PierProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PierProcess")
            .field("pid", &self.child.id())
            .finish_non_exhaustive()
    }
}

impl PierProcess {
    /// Stream output line by line until pier exits
    pub async fn follow(mut self) -> Result<ExitStatus> {
        let stdout = self.child.stdout.take();
        let stderr = self.child.stderr.take();
        let mut out = stdout.map(|s| BufReader::new(s).lines());
        let mut err = stderr.map(|s| BufReader::new(s).lines());

        while out.is_some() || err.is_some() {
            tokio::select! {
                line = next_line(&mut out) => match line {
                    Some(line) => self.sink.line(OutputStream::Stdout, &line),
                    None => out = None,
                },
                line = next_line(&mut err) => match line {
                    Some(line) => self.sink.line(OutputStream::Stderr, &line),
                    None => err = None,
                },
            }
        }

        let status = self
            .child
            .wait()
            .await
            .map_err(|e| LifecycleError::Process(format!("waiting for pier: {}", e)))?;
        info!(%status, "pier exited");
        Ok(status)
    }
}

/// Next line from an optional reader; pends forever once the reader is gone
async fn next_line<R>(reader: &mut Option<tokio::io::Lines<BufReader<R>>>) -> Option<String>
where
    R: tokio::io::AsyncRead + Unpin,
{
    match reader {
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => std::future::pending().await,
    }
}
