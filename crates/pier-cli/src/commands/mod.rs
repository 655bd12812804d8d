//! CLI command implementations

pub mod inspect;
pub mod lifecycle;

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::{OutputFormat, TerminalSink};
use clap::Args;
use pier_artifacts::{FsArtifactStore, HttpFetcher};
use pier_lifecycle::{
    BinaryExecutor, ContainerExecutor, DockerCli, LifecycleOrchestrator, OutputSink, TracingSink,
};
use pier_types::{AppchainInput, ChainType, DeploymentMode, PierInstance, TargetOs};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Flags naming one pier instance
#[derive(Debug, Clone, Args)]
pub struct InstanceArgs {
    /// Appchain type, one of ethereum or fabric
    #[arg(long, default_value = "ethereum")]
    pub appchain: ChainType,

    /// Deployment mode, one of binary or container
    #[arg(long, visible_alias = "up-type", default_value = "binary")]
    pub mode: DeploymentMode,

    /// Pier version
    #[arg(short = 'v', long = "version", default_value = "v1.6.1")]
    pub pier_version: String,

    /// Instance directory (default: $repo/pier/.pier_$appchain)
    #[arg(long)]
    pub pier_repo: Option<PathBuf>,
}

/// Appchain addressing flags
#[derive(Debug, Clone, Default, Args)]
pub struct AppchainArgs {
    /// Appchain IP
    #[arg(long)]
    pub appchain_ip: Option<String>,

    /// Appchain address, e.g. ws://10.0.0.5:8546
    #[arg(long)]
    pub appchain_addr: Option<String>,

    /// Appchain ports, comma separated
    #[arg(long, value_delimiter = ',')]
    pub appchain_ports: Vec<String>,

    /// Crypto-config directory (fabric)
    #[arg(long)]
    pub crypto_path: Option<PathBuf>,
}

impl AppchainArgs {
    pub fn input(&self) -> AppchainInput {
        AppchainInput {
            ip: self.appchain_ip.clone(),
            address: self.appchain_addr.clone(),
            ports: (!self.appchain_ports.is_empty()).then(|| self.appchain_ports.clone()),
            crypto_path: self.crypto_path.clone(),
        }
    }
}

/// Everything a command needs besides its own flags
pub struct Context {
    pub repo_root: PathBuf,
    pub config: CliConfig,
    pub format: OutputFormat,
}

impl Context {
    pub fn instance(
        &self,
        args: &InstanceArgs,
        cid: Option<String>,
        config_path: Option<PathBuf>,
    ) -> PierInstance {
        PierInstance::new(&self.repo_root, args.appchain, args.mode, &args.pier_version)
            .with_instance_repo(args.pier_repo.clone())
            .with_config_path(config_path)
            .with_container_id(cid)
    }

    /// Pier output goes to the terminal in table mode, and to the log
    /// otherwise so structured output stays parseable
    fn sink(&self) -> Arc<dyn OutputSink> {
        match self.format {
            OutputFormat::Table => Arc::new(TerminalSink),
            OutputFormat::Json | OutputFormat::Yaml => Arc::new(TracingSink),
        }
    }

    /// Wire the artifact store and both executors from the CLI config
    pub fn orchestrator(&self, attach: bool) -> CliResult<LifecycleOrchestrator> {
        let host_os = TargetOs::host()?;
        let lock_timeout = self.config.lock_timeout();

        let client = reqwest::Client::builder()
            .user_agent(concat!("pierctl/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        let mut store = FsArtifactStore::new(
            Arc::new(HttpFetcher::with_client(client)),
            self.config.urls.clone(),
        );
        if let Some(timeout) = lock_timeout {
            store = store.with_lock_timeout(timeout);
        }

        let sink = self.sink();
        let binary = BinaryExecutor::new(sink.clone())
            .with_attach(attach)
            .with_stop_timeout(self.config.stop_timeout())
            .with_command_timeout(self.config.command_timeout());

        let docker = match &self.config.docker {
            Some(program) => DockerCli::new(program.clone()),
            None => DockerCli::default(),
        }
        .with_timeout(self.config.command_timeout());
        let mut container = ContainerExecutor::new(Arc::new(docker), sink);
        if let Some(repo) = &self.config.container_repo {
            container = container.with_container_repo(repo.clone());
        }

        let mut orchestrator = LifecycleOrchestrator::new(
            Arc::new(store),
            Arc::new(binary),
            Arc::new(container),
            host_os,
        );
        if let Some(timeout) = lock_timeout {
            orchestrator = orchestrator.with_lock_timeout(timeout);
        }
        Ok(orchestrator)
    }
}
