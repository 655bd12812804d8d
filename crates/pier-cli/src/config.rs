//! CLI configuration
//!
//! ```toml
//! repo = "/srv/pierctl"
//! stop_timeout_seconds = 20
//! command_timeout_seconds = 300
//! lock_timeout_seconds = 60
//! container_repo = "/root/.pier"
//! docker = "podman"
//!
//! [urls.fabric]
//! linux = "https://mirror.local/fabric-client-{version}-Linux"
//! darwin = "https://mirror.local/fabric-client-{version}-Darwin"
//! ```

use crate::error::{CliError, CliResult};
use pier_artifacts::ArtifactUrls;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name under the home directory used when no repo is configured
const DEFAULT_REPO_DIR: &str = ".pierctl";

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CliConfig {
    /// Repo root used when neither `--repo` nor `PIERCTL_REPO` is set
    pub repo: Option<PathBuf>,

    /// Download URL templates
    #[serde(default)]
    pub urls: ArtifactUrls,

    /// Grace period between SIGTERM and SIGKILL
    pub stop_timeout_seconds: Option<u64>,

    /// Bound on one pier or docker command (register, rule deploy, docker stop)
    pub command_timeout_seconds: Option<u64>,

    /// Wait for artifact and instance locks held by another invocation
    pub lock_timeout_seconds: Option<u64>,

    /// Pier repo path inside containers
    pub container_repo: Option<PathBuf>,

    /// Container runtime program
    pub docker: Option<String>,
}

impl CliConfig {
    /// Load configuration from file
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let config: CliConfig = toml::from_str(&contents)
                .map_err(|e| CliError::Config(format!("{}: {}", config_path.display(), e)))?;
            Ok(config)
        } else {
            Ok(CliConfig::default())
        }
    }

    /// Get the default configuration file path
    fn default_config_path() -> CliResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CliError::Config("Cannot find config directory".into()))?;
        Ok(config_dir.join("pierctl").join("config.toml"))
    }

    /// Repo root: flag or env first, then the config file, then `~/.pierctl`
    pub fn repo_root(&self, flag: Option<PathBuf>) -> CliResult<PathBuf> {
        if let Some(repo) = flag.or_else(|| self.repo.clone()) {
            return Ok(repo);
        }
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Cannot find home directory; pass --repo".into()))?;
        Ok(home.join(DEFAULT_REPO_DIR))
    }

    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(pier_lifecycle::executor::DEFAULT_STOP_TIMEOUT)
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(pier_lifecycle::executor::DEFAULT_COMMAND_TIMEOUT)
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_seconds.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert!(config.repo.is_none());
        assert_eq!(config.urls, ArtifactUrls::default());
        assert_eq!(config.stop_timeout(), Duration::from_secs(10));
        assert_eq!(config.command_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_load_missing_config() {
        let config = CliConfig::load(Some(Path::new("/nonexistent/path/config.toml"))).unwrap();
        assert!(config.repo.is_none());
        assert!(config.lock_timeout().is_none());
    }

    #[test]
    fn test_load_partial_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
repo = "/srv/pier"
stop_timeout_seconds = 3
command_timeout_seconds = 45
docker = "podman"

[urls.ethereum]
linux = "https://mirror.local/eth-{version}"
darwin = "https://mirror.local/eth-{version}-mac"
"#,
        )
        .unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.stop_timeout(), Duration::from_secs(3));
        assert_eq!(config.command_timeout(), Duration::from_secs(45));
        assert_eq!(config.docker.as_deref(), Some("podman"));
        assert_eq!(config.urls.ethereum.linux, "https://mirror.local/eth-{version}");
        assert_eq!(config.urls.pier, ArtifactUrls::default().pier);
        assert_eq!(config.repo_root(None).unwrap(), PathBuf::from("/srv/pier"));
        assert_eq!(
            config.repo_root(Some(PathBuf::from("/flag"))).unwrap(),
            PathBuf::from("/flag")
        );
    }

    #[test]
    fn test_malformed_config_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "stop_timeout_seconds = \"soon\"").unwrap();

        let err = CliConfig::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }
}
