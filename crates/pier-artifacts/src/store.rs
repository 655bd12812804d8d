//! Artifact store
//!
//! Layout per (os, version):
//!
//! ```text
//! <repo>/bin/pier_<os>_<version>/
//!     pier                     unpacked binary (plus its shared libraries)
//!     <chain>-client           chain client plugin
//!     .complete-<name>         written once <name> is fully post-processed
//! <repo>/bin/pier_<os>_<version>.lock
//! ```

use crate::error::{ArtifactError, Result};
use crate::fetch::ArtifactFetcher;
use crate::lock::DirLock;
use crate::post;
use crate::urls::ArtifactUrls;
use async_trait::async_trait;
use pier_types::{ChainType, RepoLayout, TargetOs};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Default wait for a download lock held by another invocation
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(120);

/// Which executable an artifact is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// The pier relay binary
    Binary,
    /// Chain client plugin for one appchain family
    Plugin(ChainType),
}

impl ArtifactKind {
    /// File name inside the artifact directory
    pub fn file_name(&self) -> String {
        match self {
            ArtifactKind::Binary => "pier".to_string(),
            ArtifactKind::Plugin(chain) => chain.plugin_name(),
        }
    }

    pub fn marker_name(&self) -> String {
        format!(".complete-{}", self.file_name())
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Binary => f.write_str("pier binary"),
            ArtifactKind::Plugin(chain) => write!(f, "{} plugin", chain),
        }
    }
}

/// Where an artifact lives and whether it is complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactLocation {
    /// Artifact directory, also the library search path for the binary
    pub root: PathBuf,
    pub path: PathBuf,
    pub exists: bool,
}

/// Local cache of pier executables
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Compute the location without touching the network
    fn locate(
        &self,
        repo_root: &Path,
        kind: ArtifactKind,
        version: &str,
        os: TargetOs,
    ) -> ArtifactLocation;

    /// Make the artifact present, fetching it if needed
    async fn ensure(
        &self,
        repo_root: &Path,
        kind: ArtifactKind,
        version: &str,
        os: TargetOs,
    ) -> Result<ArtifactLocation>;

    async fn ensure_binary(
        &self,
        repo_root: &Path,
        version: &str,
        os: TargetOs,
    ) -> Result<ArtifactLocation> {
        self.ensure(repo_root, ArtifactKind::Binary, version, os)
            .await
    }

    async fn ensure_plugin(
        &self,
        repo_root: &Path,
        chain: ChainType,
        version: &str,
        os: TargetOs,
    ) -> Result<ArtifactLocation> {
        self.ensure(repo_root, ArtifactKind::Plugin(chain), version, os)
            .await
    }
}

/// Filesystem-backed store
pub struct FsArtifactStore {
    fetcher: Arc<dyn ArtifactFetcher>,
    urls: ArtifactUrls,
    lock_timeout: Duration,
}

impl FsArtifactStore {
    pub fn new(fetcher: Arc<dyn ArtifactFetcher>, urls: ArtifactUrls) -> Self {
        Self {
            fetcher,
            urls,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    async fn acquire(
        &self,
        location: &ArtifactLocation,
        kind: ArtifactKind,
        version: &str,
        os: TargetOs,
    ) -> Result<()> {
        let root = &location.root;

        if location.path.exists() {
            // No marker: an earlier run died part-way through
            warn!(path = %location.path.display(), "Removing partial artifact");
            std::fs::remove_file(&location.path)
                .map_err(|e| ArtifactError::io(&location.path, e))?;
        }

        let url = self.urls.render(kind, os, version)?;
        let downloaded = self.fetcher.fetch(&url, root).await?;

        match kind {
            ArtifactKind::Binary => {
                let archive = downloaded.clone();
                let dest = root.clone();
                tokio::task::spawn_blocking(move || post::unpack_strip_one(&archive, &dest))
                    .await
                    .map_err(|e| ArtifactError::Unpack {
                        archive: downloaded.clone(),
                        reason: e.to_string(),
                    })??;
                if downloaded != location.path {
                    std::fs::remove_file(&downloaded)
                        .map_err(|e| ArtifactError::io(&downloaded, e))?;
                }
                if !location.path.is_file() {
                    return Err(ArtifactError::Unpack {
                        archive: downloaded,
                        reason: "archive did not contain a pier binary".into(),
                    });
                }
                post::make_executable(&location.path)?;
                post::finish_binary(os, root).await?;
            }
            ArtifactKind::Plugin(_) => {
                if downloaded != location.path {
                    std::fs::rename(&downloaded, &location.path)
                        .map_err(|e| ArtifactError::io(&downloaded, e))?;
                }
                post::make_executable(&location.path)?;
            }
        }

        let marker = root.join(kind.marker_name());
        std::fs::write(&marker, format!("{}\n", url)).map_err(|e| ArtifactError::io(&marker, e))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    fn locate(
        &self,
        repo_root: &Path,
        kind: ArtifactKind,
        version: &str,
        os: TargetOs,
    ) -> ArtifactLocation {
        let root = RepoLayout::new(repo_root).artifact_dir(os, version);
        let path = root.join(kind.file_name());
        let exists = path.is_file() && root.join(kind.marker_name()).is_file();
        ArtifactLocation { root, path, exists }
    }

    #[instrument(skip(self, repo_root), fields(repo = %repo_root.display()))]
    async fn ensure(
        &self,
        repo_root: &Path,
        kind: ArtifactKind,
        version: &str,
        os: TargetOs,
    ) -> Result<ArtifactLocation> {
        let location = self.locate(repo_root, kind, version, os);
        if location.exists {
            debug!(path = %location.path.display(), "Artifact already present");
            return Ok(location);
        }

        std::fs::create_dir_all(&location.root)
            .map_err(|e| ArtifactError::io(&location.root, e))?;
        let lock_path = RepoLayout::new(repo_root).artifact_lock(os, version);
        let _lock = DirLock::acquire(&lock_path, self.lock_timeout).await?;

        // Another invocation may have finished while we waited
        let location = self.locate(repo_root, kind, version, os);
        if location.exists {
            debug!(path = %location.path.display(), "Artifact fetched concurrently");
            return Ok(location);
        }

        info!(%kind, version, %os, "Acquiring artifact");
        self.acquire(&location, kind, version, os).await?;
        Ok(self.locate(repo_root, kind, version, os))
    }
}
