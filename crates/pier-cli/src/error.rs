//! CLI error types

use pier_lifecycle::LifecycleError;
use pier_types::ValidationError;
use thiserror::Error;

/// Failures surfaced by pierctl commands
#[derive(Debug, Error)]
pub enum CliError {
    /// A configure, start, register, deploy-rule, stop or clean step failed
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Appchain addressing or host platform rejected before any pier work
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// pierctl's config.toml is unreadable, or no repo root could be chosen
    #[error("Configuration error: {0}")]
    Config(String),

    /// Download client for pier and plugin artifacts could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading pierctl's own config file or writing command output failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Could not encode a status, version or outcome report as JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Could not encode a status, version or outcome report as YAML
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// `clean` had no terminal to confirm the instance removal on
    #[error("Removing {0} needs confirmation; pass --yes when not running interactively")]
    ConfirmationRequired(String),

    /// The operator declined the `clean` prompt
    #[error("Aborted; {0} was left in place")]
    Aborted(String),
}

impl CliError {
    /// Follow-up hint printed under the error, if any
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            CliError::Lifecycle(e) if e.is_transient() => {
                Some("another pierctl invocation holds the lock; retry shortly")
            }
            CliError::Lifecycle(LifecycleError::RepoNotInitialized(_)) => {
                Some("point --repo (or PIERCTL_REPO) at an initialized repo containing release.json")
            }
            CliError::Lifecycle(LifecycleError::MissingArtifact(_)) => {
                Some("run `pierctl configure` with the same --appchain and --version")
            }
            _ => None,
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
