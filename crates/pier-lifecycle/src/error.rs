//! Lifecycle error types

use pier_artifacts::ArtifactError;
use pier_types::ValidationError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by lifecycle commands
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Unsupported pier version {version} (supported: {})", supported.join(", "))]
    UnsupportedVersion {
        version: String,
        supported: Vec<String>,
    },

    #[error("Repo {0} is not initialized: release.json not found (run the repo init step first)")]
    RepoNotInitialized(PathBuf),

    #[error("Release manifest {path} is malformed: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("Fetch failed: {0}")]
    Fetch(ArtifactError),

    #[error("Artifact busy: {0}")]
    ArtifactBusy(ArtifactError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Pier repo {0} has no startup binary; run configure first")]
    MissingArtifact(PathBuf),

    #[error("Container mode needs a container ID (--cid)")]
    MissingContainerId,

    #[error("Validation rule {0} not found")]
    RuleNotFound(PathBuf),

    #[error("Config template {path} is invalid: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("Instance {path} is locked by another invocation (waited {waited:?})")]
    InstanceBusy { path: PathBuf, waited: Duration },

    #[error("Process error: {0}")]
    Process(String),

    #[error("Container {container_id}: {reason}")]
    Container {
        container_id: String,
        reason: String,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LifecycleError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LifecycleError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether re-running the same command later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LifecycleError::ArtifactBusy(_) | LifecycleError::InstanceBusy { .. }
        )
    }
}

impl From<ArtifactError> for LifecycleError {
    fn from(err: ArtifactError) -> Self {
        if err.is_transient() {
            LifecycleError::ArtifactBusy(err)
        } else {
            LifecycleError::Fetch(err)
        }
    }
}

/// Result type for lifecycle operations
pub type Result<T> = std::result::Result<T, LifecycleError>;
