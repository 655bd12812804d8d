//! Deployment executors
//!
//! One executor per deployment mode. The orchestrator validates and prepares;
//! executors only perform the mode-specific side effect.

mod binary;
mod container;
mod process;
pub mod relay;

pub use binary::{process_alive, BinaryExecutor, PierProcess};
pub use container::{ContainerExecutor, ContainerRuntime, DockerCli, DEFAULT_CONTAINER_REPO};
pub use process::{OutputSink, OutputStream, ProcessOutput, TracingSink};

use crate::error::Result;
use async_trait::async_trait;
use pier_artifacts::ArtifactLocation;
use pier_types::{InstanceRecord, PierInstance};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Default grace period between SIGTERM and SIGKILL
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on a single relay command (register, rule deploy)
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Everything an executor needs for one relay operation
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub instance: &'a PierInstance,
    /// Config schema the pier version maps to
    pub schema: &'a str,
    /// Appchain method, passed through on schemas that accept it
    pub method: &'a str,
    /// Unpacked pier binary; binary mode only
    pub binary: Option<&'a ArtifactLocation>,
}

/// Result of a start request
#[derive(Debug)]
pub struct Started {
    /// Pid of a locally spawned pier
    pub pid: Option<u32>,
    /// Attached process whose output can still be followed
    pub process: Option<PierProcess>,
}

/// How a stop request ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StopOutcome {
    /// Exited after SIGTERM
    Terminated { pid: u32 },
    /// Needed SIGKILL after the grace period
    Killed { pid: u32 },
    /// `docker stop` succeeded
    ContainerStopped { container_id: String },
    /// Nothing recorded, or the recorded process is already gone
    NotRunning,
}

/// Mode-specific side effects of the lifecycle
#[async_trait]
pub trait DeploymentExecutor: Send + Sync {
    /// Run pier with the rendered config (binary) or check the container (container)
    async fn start(&self, invocation: Invocation<'_>, config: &Path) -> Result<Started>;

    /// Register the appchain with the hub through pier
    async fn register(&self, invocation: Invocation<'_>) -> Result<ProcessOutput>;

    /// Upload a validation rule through pier
    async fn deploy_rule(&self, invocation: Invocation<'_>, rule: &Path) -> Result<ProcessOutput>;

    /// Stop whatever the record says is running
    async fn stop(
        &self,
        instance: &PierInstance,
        record: Option<&InstanceRecord>,
    ) -> Result<StopOutcome>;
}
