//! Filesystem layout under the repo root
//!
//! The repo tree is the only state that survives between invocations, so
//! every path the orchestrator touches is derived here.

use crate::chain::{ChainType, TargetOs};
use std::path::{Path, PathBuf};

/// Release manifest file name
pub const RELEASE_MANIFEST: &str = "release.json";
/// Directory holding versioned config templates
pub const PIER_CONFIG_REPO: &str = "pier_config";
/// Template file inside a config schema directory
pub const PIER_MODIFY_CONFIG: &str = "pier_modify_config.toml";
/// Rendered config written into the instance directory
pub const RENDERED_CONFIG: &str = "pier.toml";
/// Lifecycle state file inside the instance directory
pub const STATE_FILE: &str = ".pier_state.json";
/// Default validation rule name
pub const DEFAULT_RULE_FILE: &str = "validating.wasm";
/// Directory plugins are copied into
pub const PLUGINS_DIR: &str = "plugins";

/// Path helpers rooted at a repo directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLayout {
    root: PathBuf,
}

impl RepoLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn release_manifest(&self) -> PathBuf {
        self.root.join(RELEASE_MANIFEST)
    }

    /// `bin/pier_<os>_<version>`
    pub fn artifact_dir(&self, os: TargetOs, version: &str) -> PathBuf {
        self.root
            .join("bin")
            .join(format!("pier_{}_{}", os.as_str(), version))
    }

    /// Sibling lock file guarding downloads into `artifact_dir`
    pub fn artifact_lock(&self, os: TargetOs, version: &str) -> PathBuf {
        self.root
            .join("bin")
            .join(format!("pier_{}_{}.lock", os.as_str(), version))
    }

    /// Default working directory for a chain's pier: `pier/.pier_<chain>`
    pub fn instance_dir(&self, chain: ChainType) -> PathBuf {
        self.root.join("pier").join(format!(".pier_{}", chain))
    }

    /// Advisory lock scoped to one instance directory
    pub fn instance_lock(&self, chain: ChainType) -> PathBuf {
        self.root.join("pier").join(format!(".pier_{}.lock", chain))
    }

    /// `pier_config/<schema>/pier_modify_config.toml`
    pub fn config_template(&self, schema: &str) -> PathBuf {
        self.root
            .join(PIER_CONFIG_REPO)
            .join(schema)
            .join(PIER_MODIFY_CONFIG)
    }
}
