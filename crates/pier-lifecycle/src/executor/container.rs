//! Container execution
//!
//! Containers are created and removed elsewhere; pierctl only addresses an
//! existing container by ID through the container runtime's CLI.

use super::process::{run_captured, OutputSink, ProcessOutput};
use super::relay::{relay_args, RelayCommand};
use super::{DeploymentExecutor, Invocation, Started, StopOutcome};
use crate::error::{LifecycleError, Result};
use async_trait::async_trait;
use pier_types::{InstanceRecord, PierInstance};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Default pier repo inside the container image
pub const DEFAULT_CONTAINER_REPO: &str = "/root/.pier";

/// Operations on an existing container
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn is_running(&self, container_id: &str) -> Result<bool>;

    /// Run `program args...` inside the container
    async fn exec(&self, container_id: &str, program: &str, args: &[OsString])
        -> Result<ProcessOutput>;

    /// Copy a host file to `dest` inside the container
    async fn copy_into(&self, container_id: &str, src: &Path, dest: &Path) -> Result<()>;

    async fn stop(&self, container_id: &str) -> Result<()>;
}

/// Runtime driving the `docker` CLI
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
    timeout: Duration,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
            timeout: super::DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

impl DockerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, container_id: &str, args: Vec<OsString>) -> Result<ProcessOutput> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        let output = run_captured(cmd, self.timeout, &self.program).await?;
        if !output.success() {
            return Err(LifecycleError::Container {
                container_id: container_id.to_string(),
                reason: output.summary(),
            });
        }
        Ok(output)
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn is_running(&self, container_id: &str) -> Result<bool> {
        let output = self
            .run(
                container_id,
                vec![
                    "inspect".into(),
                    "--format".into(),
                    "{{.State.Running}}".into(),
                    container_id.into(),
                ],
            )
            .await?;
        Ok(output.stdout.trim() == "true")
    }

    async fn exec(
        &self,
        container_id: &str,
        program: &str,
        args: &[OsString],
    ) -> Result<ProcessOutput> {
        let mut argv: Vec<OsString> = vec!["exec".into(), container_id.into(), program.into()];
        argv.extend(args.iter().cloned());
        self.run(container_id, argv).await
    }

    async fn copy_into(&self, container_id: &str, src: &Path, dest: &Path) -> Result<()> {
        let mut target = OsString::from(container_id);
        target.push(":");
        target.push(dest);
        self.run(container_id, vec!["cp".into(), src.into(), target])
            .await
            .map(|_| ())
    }

    async fn stop(&self, container_id: &str) -> Result<()> {
        self.run(container_id, vec!["stop".into(), container_id.into()])
            .await
            .map(|_| ())
    }
}

/// Drives pier inside an existing container
pub struct ContainerExecutor {
    runtime: Arc<dyn ContainerRuntime>,
    sink: Arc<dyn OutputSink>,
    container_repo: PathBuf,
}

impl ContainerExecutor {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            runtime,
            sink,
            container_repo: PathBuf::from(DEFAULT_CONTAINER_REPO),
        }
    }

    /// Pier repo path as seen from inside the container
    pub fn with_container_repo(mut self, repo: impl Into<PathBuf>) -> Self {
        self.container_repo = repo.into();
        self
    }

    async fn relay(
        &self,
        invocation: Invocation<'_>,
        command: RelayCommand<'_>,
    ) -> Result<ProcessOutput> {
        let cid = container_id(invocation.instance)?;
        let args = relay_args(
            &self.container_repo,
            command,
            invocation.schema,
            invocation.method,
        );
        let output = self.runtime.exec(cid, "pier", &args).await?;
        output.replay(self.sink.as_ref());
        Ok(output)
    }
}

fn container_id(instance: &PierInstance) -> Result<&str> {
    instance
        .container_id
        .as_deref()
        .ok_or(LifecycleError::MissingContainerId)
}

#[async_trait]
impl DeploymentExecutor for ContainerExecutor {
    #[instrument(skip_all, fields(chain = %invocation.instance.chain_type))]
    async fn start(&self, invocation: Invocation<'_>, _config: &Path) -> Result<Started> {
        if let Some(cid) = invocation.instance.container_id.as_deref() {
            if !self.runtime.is_running(cid).await? {
                return Err(LifecycleError::Container {
                    container_id: cid.to_string(),
                    reason: "container is not running".into(),
                });
            }
            info!(container_id = cid, "Container is running");
        } else {
            debug!("No container ID given; nothing to check");
        }
        Ok(Started {
            pid: None,
            process: None,
        })
    }

    async fn register(&self, invocation: Invocation<'_>) -> Result<ProcessOutput> {
        self.relay(invocation, RelayCommand::Register).await
    }

    async fn deploy_rule(&self, invocation: Invocation<'_>, rule: &Path) -> Result<ProcessOutput> {
        let cid = container_id(invocation.instance)?;
        let file_name = rule
            .file_name()
            .ok_or_else(|| LifecycleError::RuleNotFound(rule.to_path_buf()))?;
        let inside = self.container_repo.join(file_name);
        self.runtime.copy_into(cid, rule, &inside).await?;
        debug!(container_id = cid, rule = %inside.display(), "Rule copied into container");
        self.relay(invocation, RelayCommand::DeployRule { rule: &inside })
            .await
    }

    #[instrument(skip_all, fields(chain = %instance.chain_type))]
    async fn stop(
        &self,
        instance: &PierInstance,
        record: Option<&InstanceRecord>,
    ) -> Result<StopOutcome> {
        let cid = instance
            .container_id
            .clone()
            .or_else(|| record.and_then(|r| r.container_id.clone()));
        let Some(cid) = cid else {
            debug!("No container recorded");
            return Ok(StopOutcome::NotRunning);
        };
        self.runtime.stop(&cid).await?;
        info!(container_id = %cid, "Container stopped");
        Ok(StopOutcome::ContainerStopped { container_id: cid })
    }
}
