//! Pier Lifecycle - Orchestration of pier relay nodes
//!
//! Drives one pier instance per appchain through
//! configure → start → register → deploy-rule → stop → clean, either as a
//! local binary process or inside an existing container.
//!
//! ## Components
//!
//! - [`version`]: release manifest and pier→config schema mapping
//! - [`appchain`]: appchain endpoint resolution and validation
//! - [`config`]: `pier.toml` rendering from versioned templates
//! - [`executor`]: binary and container executors
//! - [`orchestrator`]: the per-command state driver
//!
//! Every mutating command holds an advisory lock on
//! `<repo>/pier/.pier_<chain>.lock` while it prepares, taken only once the
//! request has passed validation.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod appchain;
pub mod config;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod state;
pub mod version;

pub use error::{LifecycleError, Result};
pub use executor::{
    BinaryExecutor, ContainerExecutor, ContainerRuntime, DeploymentExecutor, DockerCli,
    OutputSink, OutputStream, PierProcess, ProcessOutput, StopOutcome, TracingSink,
};
pub use orchestrator::{
    CleanOutcome, ConfigureOutcome, InstanceStatus, LifecycleOrchestrator, RelayOutcome,
    StartOutcome, VersionInfo,
};
