//! Pier instance description
//!
//! A `PierInstance` is rebuilt from flags and filesystem defaults on every
//! invocation; it is never persisted as a struct.

use crate::chain::{ChainType, DeploymentMode};
use crate::layout::{RepoLayout, DEFAULT_RULE_FILE, RENDERED_CONFIG, STATE_FILE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One relay-node deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PierInstance {
    pub chain_type: ChainType,
    pub mode: DeploymentMode,
    pub version: String,
    pub repo_root: PathBuf,
    /// Working directory for this instance
    pub instance_repo: PathBuf,
    /// Config template override; the version-mapped template is used when unset
    pub config_path: Option<PathBuf>,
    /// Only meaningful in container mode
    pub container_id: Option<String>,
}

impl PierInstance {
    pub fn new(
        repo_root: impl Into<PathBuf>,
        chain_type: ChainType,
        mode: DeploymentMode,
        version: impl Into<String>,
    ) -> Self {
        let repo_root = repo_root.into();
        let instance_repo = RepoLayout::new(&repo_root).instance_dir(chain_type);
        Self {
            chain_type,
            mode,
            version: version.into(),
            repo_root,
            instance_repo,
            config_path: None,
            container_id: None,
        }
    }

    pub fn with_instance_repo(mut self, repo: Option<PathBuf>) -> Self {
        if let Some(repo) = repo {
            self.instance_repo = repo;
        }
        self
    }

    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Attach a container ID; ignored outside container mode
    pub fn with_container_id(mut self, id: Option<String>) -> Self {
        self.container_id = match self.mode {
            DeploymentMode::Container => id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            DeploymentMode::Binary => None,
        };
        self
    }

    pub fn layout(&self) -> RepoLayout {
        RepoLayout::new(&self.repo_root)
    }

    /// Config template, honouring the operator override
    pub fn config_template(&self, schema: &str) -> PathBuf {
        self.config_path
            .clone()
            .unwrap_or_else(|| self.layout().config_template(schema))
    }

    pub fn rendered_config(&self) -> PathBuf {
        self.instance_repo.join(RENDERED_CONFIG)
    }

    pub fn state_file(&self) -> PathBuf {
        self.instance_repo.join(STATE_FILE)
    }

    /// `<instanceRepo>/<chain>/validating.wasm`
    pub fn default_rule_path(&self) -> PathBuf {
        self.instance_repo
            .join(self.chain_type.as_str())
            .join(DEFAULT_RULE_FILE)
    }

    pub fn is_present(&self) -> bool {
        Path::new(&self.instance_repo).is_dir()
    }
}
