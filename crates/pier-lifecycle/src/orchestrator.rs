//! Lifecycle Orchestrator - one operation per lifecycle command
//!
//! Each operation validates its preconditions, prepares artifacts and
//! configuration, delegates the side effect to the executor for the
//! instance's deployment mode, and records the resulting lifecycle state.
//! Commands may run in any order unless a precondition fails.

use crate::appchain;
use crate::config::{self, RenderedConfig};
use crate::error::{LifecycleError, Result};
use crate::executor::{
    process_alive, DeploymentExecutor, Invocation, PierProcess, ProcessOutput, StopOutcome,
};
use crate::state;
use crate::version;
use pier_artifacts::{ArtifactError, ArtifactKind, ArtifactLocation, ArtifactStore, DirLock};
use pier_types::{
    AppchainEndpoint, AppchainInput, ChainType, DeploymentMode, InstanceRecord, LifecycleState,
    PierInstance, RepoLayout, TargetOs,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Default wait for an instance lock held by another invocation
pub const DEFAULT_INSTANCE_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of `configure`
#[derive(Debug, Clone, Serialize)]
pub struct ConfigureOutcome {
    pub schema: String,
    pub endpoint: AppchainEndpoint,
    pub binary: ArtifactLocation,
    pub plugin: ArtifactLocation,
    pub config: PathBuf,
}

/// Result of `start`
#[derive(Debug)]
pub struct StartOutcome {
    pub endpoint: AppchainEndpoint,
    /// Rendered config pier was started with; binary mode only
    pub config: Option<PathBuf>,
    pub pid: Option<u32>,
    /// Attached pier process, ready to be followed
    pub process: Option<PierProcess>,
}

/// Result of `register` and `deploy-rule`
#[derive(Debug, Clone, Serialize)]
pub struct RelayOutcome {
    pub schema: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<PathBuf>,
    pub output: ProcessOutput,
}

/// Result of `clean`
#[derive(Debug, Clone, Serialize)]
pub struct CleanOutcome {
    pub stopped: StopOutcome,
    /// Instance directory that was removed, if it existed
    pub removed: Option<PathBuf>,
}

/// Persisted view of one chain's default instance
#[derive(Debug, Clone, Serialize)]
pub struct InstanceStatus {
    pub chain_type: ChainType,
    pub instance_repo: PathBuf,
    pub present: bool,
    pub record: Option<InstanceRecord>,
    /// Liveness of the recorded pid, when there is one
    pub alive: Option<bool>,
}

/// A supported pier version and its config schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub version: String,
    pub schema: Option<String>,
}

/// Drives pier instances through configure, start, register, deploy-rule,
/// stop and clean
pub struct LifecycleOrchestrator {
    store: Arc<dyn ArtifactStore>,
    binary: Arc<dyn DeploymentExecutor>,
    container: Arc<dyn DeploymentExecutor>,
    host_os: TargetOs,
    lock_timeout: Duration,
}

impl LifecycleOrchestrator {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        binary: Arc<dyn DeploymentExecutor>,
        container: Arc<dyn DeploymentExecutor>,
        host_os: TargetOs,
    ) -> Self {
        Self {
            store,
            binary,
            container,
            host_os,
            lock_timeout: DEFAULT_INSTANCE_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    fn executor(&self, mode: DeploymentMode) -> &dyn DeploymentExecutor {
        match mode {
            DeploymentMode::Binary => self.binary.as_ref(),
            DeploymentMode::Container => self.container.as_ref(),
        }
    }

    /// OS the chain plugin is built for; containers always run linux
    fn plugin_os(&self, mode: DeploymentMode) -> TargetOs {
        match mode {
            DeploymentMode::Binary => self.host_os,
            DeploymentMode::Container => TargetOs::Linux,
        }
    }

    async fn lock(&self, instance: &PierInstance) -> Result<DirLock> {
        let path = instance.layout().instance_lock(instance.chain_type);
        DirLock::acquire(&path, self.lock_timeout)
            .await
            .map_err(|e| match e {
                ArtifactError::Busy { path, waited } => LifecycleError::InstanceBusy { path, waited },
                other => LifecycleError::from(other),
            })
    }

    /// Check the version against the release manifest; returns the config schema
    fn resolve_version(&self, instance: &PierInstance) -> Result<&'static str> {
        let manifest = version::load_manifest(&instance.layout())?;
        version::resolve(&instance.version, &manifest.pier)
    }

    /// Instance repo must exist for binary relay commands; no auto-provision
    fn require_instance_repo(instance: &PierInstance) -> Result<()> {
        if instance.mode == DeploymentMode::Binary && !instance.is_present() {
            return Err(LifecycleError::MissingArtifact(instance.instance_repo.clone()));
        }
        Ok(())
    }

    fn require_container_id(instance: &PierInstance) -> Result<()> {
        if instance.mode == DeploymentMode::Container && instance.container_id.is_none() {
            return Err(LifecycleError::MissingContainerId);
        }
        Ok(())
    }

    /// Fetch the pier binary and chain plugin, then render the instance config
    #[instrument(skip(self, instance, input), fields(chain = %instance.chain_type, mode = %instance.mode, version = %instance.version))]
    pub async fn configure(
        &self,
        instance: &PierInstance,
        input: &AppchainInput,
    ) -> Result<ConfigureOutcome> {
        let schema = self.resolve_version(instance)?;
        let endpoint = appchain::resolve(instance.chain_type, input)?;
        let _lock = self.lock(instance).await?;

        let binary = self
            .store
            .ensure_binary(&instance.repo_root, &instance.version, self.host_os)
            .await?;
        let plugin = self
            .store
            .ensure_plugin(
                &instance.repo_root,
                instance.chain_type,
                &instance.version,
                self.plugin_os(instance.mode),
            )
            .await?;

        let RenderedConfig { config, .. } = config::render(instance, schema, &endpoint, &plugin.path)?;
        state::transition(instance, LifecycleState::Configured, None)?;
        info!(config = %config.display(), "Pier configured");

        Ok(ConfigureOutcome {
            schema: schema.to_string(),
            endpoint,
            binary,
            plugin,
            config,
        })
    }

    /// Start pier (binary) or check the container (container)
    #[instrument(skip(self, instance, input), fields(chain = %instance.chain_type, mode = %instance.mode, version = %instance.version))]
    pub async fn start(&self, instance: &PierInstance, input: &AppchainInput) -> Result<StartOutcome> {
        let schema = self.resolve_version(instance)?;
        let endpoint = appchain::resolve(instance.chain_type, input)?;
        // New addressing or a template override invalidates the rendered config
        let rerender = *input != AppchainInput::default() || instance.config_path.is_some();
        let _lock = self.lock(instance).await?;

        match instance.mode {
            DeploymentMode::Binary => {
                std::fs::create_dir_all(&instance.instance_repo)
                    .map_err(|e| LifecycleError::io(&instance.instance_repo, e))?;

                let binary = self.store.locate(
                    &instance.repo_root,
                    ArtifactKind::Binary,
                    &instance.version,
                    self.host_os,
                );
                if !binary.exists {
                    return Err(LifecycleError::MissingArtifact(binary.path));
                }

                let config = self.ensure_config(instance, schema, &endpoint, rerender)?;
                let invocation = Invocation {
                    instance,
                    schema,
                    method: "",
                    binary: Some(&binary),
                };
                let started = self.binary.start(invocation, &config).await?;
                state::transition(instance, LifecycleState::Started, started.pid)?;

                Ok(StartOutcome {
                    endpoint,
                    config: Some(config),
                    pid: started.pid,
                    process: started.process,
                })
            }
            DeploymentMode::Container => {
                let invocation = Invocation {
                    instance,
                    schema,
                    method: "",
                    binary: None,
                };
                let started = self
                    .container
                    .start(invocation, &instance.rendered_config())
                    .await?;
                state::transition(instance, LifecycleState::Started, None)?;
                Ok(StartOutcome {
                    endpoint,
                    config: None,
                    pid: started.pid,
                    process: started.process,
                })
            }
        }
    }

    /// Rendered config, rendering it first when missing or when `rerender` is set
    fn ensure_config(
        &self,
        instance: &PierInstance,
        schema: &str,
        endpoint: &AppchainEndpoint,
        rerender: bool,
    ) -> Result<PathBuf> {
        let rendered = instance.rendered_config();
        if rendered.is_file() && !rerender {
            debug!(config = %rendered.display(), "Using existing config");
            return Ok(rendered);
        }

        let plugin = self.store.locate(
            &instance.repo_root,
            ArtifactKind::Plugin(instance.chain_type),
            &instance.version,
            self.plugin_os(instance.mode),
        );
        if !plugin.exists {
            return Err(LifecycleError::MissingArtifact(plugin.path));
        }
        Ok(config::render(instance, schema, endpoint, &plugin.path)?.config)
    }

    /// Stream an attached pier's output until it exits, then record the stop
    pub async fn follow(&self, instance: &PierInstance, process: PierProcess) -> Result<ExitStatus> {
        let status = process.follow().await?;
        if let Some(record) = state::load(instance)? {
            let mut record = record.transition(LifecycleState::Stopped);
            record.pid = None;
            state::save(instance, &record)?;
        }
        Ok(status)
    }

    /// Register the appchain with the hub
    #[instrument(skip(self, instance), fields(chain = %instance.chain_type, mode = %instance.mode, version = %instance.version))]
    pub async fn register(&self, instance: &PierInstance, method: &str) -> Result<RelayOutcome> {
        Self::require_container_id(instance)?;
        let schema = self.resolve_version(instance)?;
        Self::require_instance_repo(instance)?;
        let _lock = self.lock(instance).await?;

        let binary = self.binary_for(instance).await?;
        let output = self
            .executor(instance.mode)
            .register(Invocation {
                instance,
                schema,
                method,
                binary: binary.as_ref(),
            })
            .await?;

        state::transition(instance, LifecycleState::Registered, None)?;
        info!("Appchain registered");
        Ok(RelayOutcome {
            schema: schema.to_string(),
            rule: None,
            output,
        })
    }

    /// Upload a validation rule; defaults to `<instanceRepo>/<chain>/validating.wasm`
    #[instrument(skip(self, instance), fields(chain = %instance.chain_type, mode = %instance.mode, version = %instance.version))]
    pub async fn deploy_rule(
        &self,
        instance: &PierInstance,
        rule: Option<&Path>,
        method: &str,
    ) -> Result<RelayOutcome> {
        Self::require_container_id(instance)?;
        let schema = self.resolve_version(instance)?;
        Self::require_instance_repo(instance)?;

        let rule = rule
            .map(Path::to_path_buf)
            .unwrap_or_else(|| instance.default_rule_path());
        if !rule.is_file() {
            return Err(LifecycleError::RuleNotFound(rule));
        }
        let _lock = self.lock(instance).await?;

        let binary = self.binary_for(instance).await?;
        let output = self
            .executor(instance.mode)
            .deploy_rule(
                Invocation {
                    instance,
                    schema,
                    method,
                    binary: binary.as_ref(),
                },
                &rule,
            )
            .await?;

        state::transition(instance, LifecycleState::RuleDeployed, None)?;
        info!(rule = %rule.display(), "Rule deployed");
        Ok(RelayOutcome {
            schema: schema.to_string(),
            rule: Some(rule),
            output,
        })
    }

    /// Re-ensure the binary in binary mode
    async fn binary_for(&self, instance: &PierInstance) -> Result<Option<ArtifactLocation>> {
        match instance.mode {
            DeploymentMode::Binary => {
                let binary = self
                    .store
                    .ensure_binary(&instance.repo_root, &instance.version, self.host_os)
                    .await?;
                debug!(root = %binary.root.display(), "Pier binary ready");
                Ok(Some(binary))
            }
            DeploymentMode::Container => Ok(None),
        }
    }

    /// Stop the recorded process or container
    #[instrument(skip(self, instance), fields(chain = %instance.chain_type))]
    pub async fn stop(&self, instance: &PierInstance) -> Result<StopOutcome> {
        let _lock = self.lock(instance).await?;
        let record = state::load(instance)?;
        let mode = stop_mode(instance, record.as_ref());

        let outcome = self.executor(mode).stop(instance, record.as_ref()).await?;

        if let Some(record) = record {
            let mut record = record.transition(LifecycleState::Stopped);
            record.pid = None;
            state::save(instance, &record)?;
        }
        info!(?outcome, "Stop finished");
        Ok(outcome)
    }

    /// Stop any recorded local process, then remove the instance directory
    #[instrument(skip(self, instance), fields(chain = %instance.chain_type))]
    pub async fn clean(&self, instance: &PierInstance) -> Result<CleanOutcome> {
        let _lock = self.lock(instance).await?;
        let record = state::load(instance)?;

        // Containers are managed externally; only local processes are stopped
        let stopped = match record.as_ref() {
            Some(record)
                if record.mode == DeploymentMode::Binary && record.state.may_be_running() =>
            {
                self.binary.stop(instance, Some(record)).await?
            }
            _ => StopOutcome::NotRunning,
        };

        let removed = if instance.instance_repo.exists() {
            std::fs::remove_dir_all(&instance.instance_repo)
                .map_err(|e| LifecycleError::io(&instance.instance_repo, e))?;
            info!(path = %instance.instance_repo.display(), "Instance removed");
            Some(instance.instance_repo.clone())
        } else {
            warn!(path = %instance.instance_repo.display(), "Nothing to clean");
            None
        };

        Ok(CleanOutcome { stopped, removed })
    }
}

/// Executor mode for `stop`: an explicit container ID wins over the record
fn stop_mode(instance: &PierInstance, record: Option<&InstanceRecord>) -> DeploymentMode {
    let recorded = record.map(|r| r.mode);
    if instance.container_id.is_some() {
        if recorded == Some(DeploymentMode::Binary) {
            warn!(
                container_id = instance.container_id.as_deref().unwrap_or_default(),
                "Record says binary mode, stopping the given container instead"
            );
        }
        return DeploymentMode::Container;
    }
    recorded.unwrap_or(instance.mode)
}

/// Persisted state of every chain's default instance under `repo_root`
pub fn status(repo_root: &Path) -> Result<Vec<InstanceStatus>> {
    let layout = RepoLayout::new(repo_root);
    ChainType::ALL
        .iter()
        .map(|&chain| {
            let instance_repo = layout.instance_dir(chain);
            let record =
                state::load_from(&instance_repo.join(pier_types::layout::STATE_FILE))?;
            let alive = record.as_ref().and_then(|r| r.pid).map(process_alive);
            Ok(InstanceStatus {
                chain_type: chain,
                present: instance_repo.is_dir(),
                instance_repo,
                record,
                alive,
            })
        })
        .collect()
}

/// Supported pier versions from the release manifest
pub fn versions(repo_root: &Path) -> Result<Vec<VersionInfo>> {
    let manifest = version::load_manifest(&RepoLayout::new(repo_root))?;
    Ok(manifest
        .pier
        .iter()
        .map(|v| VersionInfo {
            version: v.clone(),
            schema: version::config_schema(v).map(str::to_string),
        })
        .collect())
}
