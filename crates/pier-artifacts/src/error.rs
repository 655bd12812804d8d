//! Artifact error types

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while locating or acquiring an artifact
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Fetch of {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Unpacking {archive} failed: {reason}")]
    Unpack { archive: PathBuf, reason: String },

    #[error("Post-processing {path} failed: {reason}")]
    PostProcess { path: PathBuf, reason: String },

    #[error("No download URL configured for {0}")]
    MissingTemplate(String),

    #[error("Artifact directory lock {path} still held by another process after {waited:?}")]
    Busy { path: PathBuf, waited: Duration },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArtifactError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArtifactError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether retrying later may succeed without operator action
    pub fn is_transient(&self) -> bool {
        matches!(self, ArtifactError::Busy { .. })
    }
}

/// Result type for artifact operations
pub type Result<T> = std::result::Result<T, ArtifactError>;
