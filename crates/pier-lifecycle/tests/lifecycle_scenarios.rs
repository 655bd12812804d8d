//! End-to-end lifecycle scenarios against a temporary repo root
//!
//! Downloads are served by an in-process fetcher; the "pier" binary is a
//! shell script that echoes its arguments.

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use pier_artifacts::fetch::file_name_for;
use pier_artifacts::{ArtifactError, ArtifactFetcher, ArtifactUrls, FsArtifactStore};
use pier_lifecycle::{
    BinaryExecutor, ContainerExecutor, ContainerRuntime, LifecycleError, LifecycleOrchestrator,
    ProcessOutput, StopOutcome, TracingSink,
};
use pier_types::{
    AppchainInput, ChainType, DeploymentMode, InstanceRecord, LifecycleState, PierInstance,
    TargetOs,
};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const FAKE_PIER: &[u8] = b"#!/bin/sh\necho \"pier $*\"\n";

const TEMPLATE: &str = r#"
title = "pier"

[port]
http = 44544

[appchain]
plugin = "placeholder"
"#;

#[derive(Default)]
struct CountingFetcher {
    calls: AtomicUsize,
}

#[async_trait]
impl ArtifactFetcher for CountingFetcher {
    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, ArtifactError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let target = dest_dir.join(file_name_for(url)?);
        if url.ends_with(".tar.gz") {
            let file = std::fs::File::create(&target).unwrap();
            let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::fast()));
            let mut header = tar::Header::new_gnu();
            header.set_size(FAKE_PIER.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder
                .append_data(&mut header, "pier_release/pier", FAKE_PIER)
                .unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        } else {
            std::fs::write(&target, b"plugin").unwrap();
        }
        Ok(target)
    }
}

#[derive(Default)]
struct MockRuntime {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn is_running(&self, _container_id: &str) -> pier_lifecycle::Result<bool> {
        Ok(true)
    }

    async fn exec(
        &self,
        container_id: &str,
        program: &str,
        args: &[OsString],
    ) -> pier_lifecycle::Result<ProcessOutput> {
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        self.calls
            .lock()
            .unwrap()
            .push(format!("exec {} {} {}", container_id, program, args.join(" ")));
        Ok(ProcessOutput {
            code: Some(0),
            ..Default::default()
        })
    }

    async fn copy_into(
        &self,
        container_id: &str,
        _src: &Path,
        dest: &Path,
    ) -> pier_lifecycle::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("cp {}:{}", container_id, dest.display()));
        Ok(())
    }

    async fn stop(&self, container_id: &str) -> pier_lifecycle::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("stop {}", container_id));
        Ok(())
    }
}

struct Fixture {
    repo: TempDir,
    fetcher: Arc<CountingFetcher>,
    runtime: Arc<MockRuntime>,
    orchestrator: LifecycleOrchestrator,
}

impl Fixture {
    fn new() -> Self {
        let repo = tempfile::tempdir().unwrap();
        std::fs::write(
            repo.path().join("release.json"),
            r#"{"pier": ["v1.6.1", "v1.7.0", "v1.8.0"], "bitxhub": ["v1.6.0"]}"#,
        )
        .unwrap();
        for schema in ["v1.6.1", "v1.8.0"] {
            let dir = repo.path().join("pier_config").join(schema);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("pier_modify_config.toml"), TEMPLATE).unwrap();
        }
        Self::with_repo(repo)
    }

    fn with_repo(repo: TempDir) -> Self {
        let fetcher = Arc::new(CountingFetcher::default());
        let runtime = Arc::new(MockRuntime::default());
        let sink = Arc::new(TracingSink);

        let store = FsArtifactStore::new(fetcher.clone(), ArtifactUrls::default())
            .with_lock_timeout(Duration::from_secs(2));
        let binary = BinaryExecutor::new(sink.clone()).with_stop_timeout(Duration::from_secs(2));
        let container = ContainerExecutor::new(runtime.clone(), sink);
        let orchestrator = LifecycleOrchestrator::new(
            Arc::new(store),
            Arc::new(binary),
            Arc::new(container),
            TargetOs::Linux,
        )
        .with_lock_timeout(Duration::from_secs(2));

        Self {
            repo,
            fetcher,
            runtime,
            orchestrator,
        }
    }

    fn instance(&self, chain: ChainType, mode: DeploymentMode, version: &str) -> PierInstance {
        PierInstance::new(self.repo.path(), chain, mode, version)
    }

    fn fetches(&self) -> usize {
        self.fetcher.calls.load(Ordering::SeqCst)
    }
}

fn fabric_input() -> AppchainInput {
    AppchainInput {
        crypto_path: Some(PathBuf::from("/opt/crypto-config")),
        ..Default::default()
    }
}

#[tokio::test]
async fn scenario_ether_defaults() {
    let fx = Fixture::new();
    let instance = fx.instance(ChainType::Ethereum, DeploymentMode::Binary, "v1.6.1");

    let outcome = fx
        .orchestrator
        .configure(&instance, &AppchainInput::default())
        .await
        .unwrap();

    assert_eq!(outcome.endpoint.ip, "0.0.0.0");
    assert_eq!(outcome.endpoint.address, "ws://0.0.0.0:8546");
    assert_eq!(outcome.endpoint.ports, vec!["8546".to_string()]);
    assert_eq!(outcome.schema, "v1.6.1");
    assert_eq!(fx.fetches(), 2);

    let rendered = std::fs::read_to_string(instance.rendered_config()).unwrap();
    assert!(rendered.contains("ws://0.0.0.0:8546"));
    assert!(instance
        .instance_repo
        .join("plugins/ethereum-client")
        .is_file());

    let record = pier_lifecycle::state::load(&instance).unwrap().unwrap();
    assert_eq!(record.state, LifecycleState::Configured);
}

#[tokio::test]
async fn scenario_fabric_defaults() {
    let fx = Fixture::new();
    let instance = fx.instance(ChainType::Fabric, DeploymentMode::Binary, "v1.7.0");

    let outcome = fx
        .orchestrator
        .configure(&instance, &fabric_input())
        .await
        .unwrap();

    assert_eq!(outcome.endpoint.ports, ChainType::Fabric.default_ports());
    assert_eq!(outcome.endpoint.address, "127.0.0.1:7053");
    assert_eq!(outcome.endpoint.ip, "127.0.0.1");
}

#[tokio::test]
async fn scenario_register_binary_without_configure() {
    let fx = Fixture::new();
    let instance = fx.instance(ChainType::Ethereum, DeploymentMode::Binary, "v1.6.1");

    let err = fx
        .orchestrator
        .register(&instance, "appchain")
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::MissingArtifact(_)));
    assert_eq!(fx.fetches(), 0);
}

#[tokio::test]
async fn scenario_register_container_without_id() {
    // No release.json: the container ID check must come first
    let fx = Fixture::with_repo(tempfile::tempdir().unwrap());
    let instance = fx
        .instance(ChainType::Fabric, DeploymentMode::Container, "v9.9.9")
        .with_container_id(Some(String::new()));

    let err = fx
        .orchestrator
        .register(&instance, "appchain")
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::MissingContainerId));
    assert!(fx.runtime.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn configure_twice_fetches_once() {
    let fx = Fixture::new();
    let instance = fx.instance(ChainType::Ethereum, DeploymentMode::Binary, "v1.8.0");

    fx.orchestrator
        .configure(&instance, &AppchainInput::default())
        .await
        .unwrap();
    fx.orchestrator
        .configure(&instance, &AppchainInput::default())
        .await
        .unwrap();

    assert_eq!(fx.fetches(), 2);
}

#[tokio::test]
async fn unsupported_version_does_no_io() {
    let fx = Fixture::new();
    let instance = fx.instance(ChainType::Ethereum, DeploymentMode::Binary, "v1.9.0");

    let err = fx
        .orchestrator
        .configure(&instance, &AppchainInput::default())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("v1.9.0"));
    assert!(matches!(err, LifecycleError::UnsupportedVersion { .. }));
    assert_eq!(fx.fetches(), 0);
    assert!(!instance.instance_repo.exists());

    let err = fx
        .orchestrator
        .register(&instance, "appchain")
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::UnsupportedVersion { .. }));

    // Rejected before the instance lock is taken
    assert!(!fx.repo.path().join("pier").exists());
}

#[tokio::test]
async fn uninitialized_repo_is_reported() {
    let fx = Fixture::with_repo(tempfile::tempdir().unwrap());
    let instance = fx.instance(ChainType::Ethereum, DeploymentMode::Binary, "v1.6.1");

    let err = fx
        .orchestrator
        .configure(&instance, &AppchainInput::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::RepoNotInitialized(_)));
}

#[tokio::test]
async fn start_binary_requires_artifact() {
    let fx = Fixture::new();
    let instance = fx.instance(ChainType::Ethereum, DeploymentMode::Binary, "v1.6.1");

    let err = fx
        .orchestrator
        .start(&instance, &AppchainInput::default())
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::MissingArtifact(_)));
    assert_eq!(fx.fetches(), 0);
    // The instance repo is created even though start fails
    assert!(instance.instance_repo.is_dir());
}

#[tokio::test]
async fn binary_start_follow_records_stop() {
    let fx = Fixture::new();
    let instance = fx.instance(ChainType::Ethereum, DeploymentMode::Binary, "v1.8.0");
    fx.orchestrator
        .configure(&instance, &AppchainInput::default())
        .await
        .unwrap();

    let started = fx
        .orchestrator
        .start(&instance, &AppchainInput::default())
        .await
        .unwrap();
    assert!(started.pid.is_some());
    assert_eq!(started.config, Some(instance.rendered_config()));

    let record = pier_lifecycle::state::load(&instance).unwrap().unwrap();
    assert_eq!(record.state, LifecycleState::Started);
    assert_eq!(record.pid, started.pid);

    let status = fx
        .orchestrator
        .follow(&instance, started.process.unwrap())
        .await
        .unwrap();
    assert!(status.success());

    let record = pier_lifecycle::state::load(&instance).unwrap().unwrap();
    assert_eq!(record.state, LifecycleState::Stopped);
    assert_eq!(record.pid, None);
}

#[tokio::test]
async fn start_with_new_address_rerenders_config() {
    let fx = Fixture::new();
    let instance = fx.instance(ChainType::Ethereum, DeploymentMode::Binary, "v1.8.0");
    fx.orchestrator
        .configure(&instance, &AppchainInput::default())
        .await
        .unwrap();

    let input = AppchainInput {
        address: Some("ws://10.9.9.9:9999".into()),
        ports: Some(vec!["9999".into()]),
        ..Default::default()
    };
    let started = fx.orchestrator.start(&instance, &input).await.unwrap();
    assert_eq!(started.endpoint.address, "ws://10.9.9.9:9999");

    let rendered = std::fs::read_to_string(instance.rendered_config()).unwrap();
    assert!(rendered.contains("ws://10.9.9.9:9999"));
    assert!(!rendered.contains("ws://0.0.0.0:8546"));

    fx.orchestrator
        .follow(&instance, started.process.unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn start_without_input_keeps_rendered_config() {
    let fx = Fixture::new();
    let instance = fx.instance(ChainType::Ethereum, DeploymentMode::Binary, "v1.8.0");
    fx.orchestrator
        .configure(&instance, &AppchainInput::default())
        .await
        .unwrap();

    // Hand edits survive a plain start
    let config = instance.rendered_config();
    let edited = format!("{}\n# tuned by hand\n", std::fs::read_to_string(&config).unwrap());
    std::fs::write(&config, &edited).unwrap();

    let started = fx
        .orchestrator
        .start(&instance, &AppchainInput::default())
        .await
        .unwrap();
    assert_eq!(std::fs::read_to_string(&config).unwrap(), edited);

    fx.orchestrator
        .follow(&instance, started.process.unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn stop_with_reused_pid_clears_record() {
    let fx = Fixture::new();
    let instance = fx.instance(ChainType::Ethereum, DeploymentMode::Binary, "v1.8.0");

    // pier exited long ago and an unrelated process now holds its pid
    let mut unrelated = std::process::Command::new("sleep").arg("30").spawn().unwrap();
    let mut record = InstanceRecord::new(
        LifecycleState::Started,
        ChainType::Ethereum,
        DeploymentMode::Binary,
        "v1.8.0",
    );
    record.pid = Some(unrelated.id());
    pier_lifecycle::state::save(&instance, &record).unwrap();

    let outcome = fx.orchestrator.stop(&instance).await.unwrap();
    assert_eq!(outcome, StopOutcome::NotRunning);
    assert!(unrelated.try_wait().unwrap().is_none());

    let record = pier_lifecycle::state::load(&instance).unwrap().unwrap();
    assert_eq!(record.state, LifecycleState::Stopped);
    assert_eq!(record.pid, None);

    let cleaned = fx.orchestrator.clean(&instance).await.unwrap();
    assert_eq!(cleaned.stopped, StopOutcome::NotRunning);
    assert!(unrelated.try_wait().unwrap().is_none());

    unrelated.kill().unwrap();
    unrelated.wait().unwrap();
}

#[tokio::test]
async fn explicit_container_stop_overrides_binary_record() {
    let fx = Fixture::new();
    let by_chain = fx.instance(ChainType::Ethereum, DeploymentMode::Binary, "v1.8.0");
    let record = InstanceRecord::new(
        LifecycleState::Configured,
        ChainType::Ethereum,
        DeploymentMode::Binary,
        "v1.8.0",
    );
    pier_lifecycle::state::save(&by_chain, &record).unwrap();

    let instance = fx
        .instance(ChainType::Ethereum, DeploymentMode::Container, "v1.8.0")
        .with_container_id(Some("pier-eth".into()));
    let outcome = fx.orchestrator.stop(&instance).await.unwrap();

    assert_eq!(
        outcome,
        StopOutcome::ContainerStopped {
            container_id: "pier-eth".into()
        }
    );
    assert_eq!(fx.runtime.calls.lock().unwrap().as_slice(), ["stop pier-eth"]);
}

#[tokio::test]
async fn binary_register_rule_and_clean() {
    let fx = Fixture::new();
    let instance = fx.instance(ChainType::Ethereum, DeploymentMode::Binary, "v1.8.0");
    fx.orchestrator
        .configure(&instance, &AppchainInput::default())
        .await
        .unwrap();

    let registered = fx
        .orchestrator
        .register(&instance, "appchain")
        .await
        .unwrap();
    assert!(registered
        .output
        .stdout
        .contains("appchain register --method appchain"));
    // Binary was already present
    assert_eq!(fx.fetches(), 2);

    let err = fx
        .orchestrator
        .deploy_rule(&instance, None, "appchain")
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::RuleNotFound(_)));

    let rule = instance.default_rule_path();
    std::fs::create_dir_all(rule.parent().unwrap()).unwrap();
    std::fs::write(&rule, b"\0asm").unwrap();
    let deployed = fx
        .orchestrator
        .deploy_rule(&instance, None, "appchain")
        .await
        .unwrap();
    assert_eq!(deployed.rule.as_deref(), Some(rule.as_path()));
    assert!(deployed.output.stdout.contains("rule deploy --path"));

    let record = pier_lifecycle::state::load(&instance).unwrap().unwrap();
    assert_eq!(record.state, LifecycleState::RuleDeployed);

    let cleaned = fx.orchestrator.clean(&instance).await.unwrap();
    assert_eq!(cleaned.removed, Some(instance.instance_repo.clone()));
    assert!(!instance.instance_repo.exists());
}

#[tokio::test]
async fn container_register_and_stop() {
    let fx = Fixture::new();
    let instance = fx
        .instance(ChainType::Fabric, DeploymentMode::Container, "v1.6.1")
        .with_container_id(Some("pier-fabric".into()));

    fx.orchestrator
        .register(&instance, "appchain")
        .await
        .unwrap();
    assert_eq!(fx.fetches(), 0);

    // Stop picks the container up from the recorded state
    let by_chain = fx.instance(ChainType::Fabric, DeploymentMode::Binary, "v1.6.1");
    let outcome = fx.orchestrator.stop(&by_chain).await.unwrap();
    assert_eq!(
        outcome,
        StopOutcome::ContainerStopped {
            container_id: "pier-fabric".into()
        }
    );

    let calls = fx.runtime.calls.lock().unwrap();
    assert_eq!(
        calls.as_slice(),
        [
            "exec pier-fabric pier --repo /root/.pier appchain register",
            "stop pier-fabric",
        ]
    );
}

#[tokio::test]
async fn stop_without_record_is_tolerated() {
    let fx = Fixture::new();
    let instance = fx.instance(ChainType::Ethereum, DeploymentMode::Binary, "v1.6.1");
    assert_eq!(
        fx.orchestrator.stop(&instance).await.unwrap(),
        StopOutcome::NotRunning
    );
    assert!(pier_lifecycle::state::load(&instance).unwrap().is_none());
}

#[tokio::test]
async fn status_and_versions() {
    let fx = Fixture::new();
    let instance = fx.instance(ChainType::Ethereum, DeploymentMode::Binary, "v1.6.1");
    fx.orchestrator
        .configure(&instance, &AppchainInput::default())
        .await
        .unwrap();

    let statuses = pier_lifecycle::orchestrator::status(fx.repo.path()).unwrap();
    assert_eq!(statuses.len(), 2);
    let ether = statuses
        .iter()
        .find(|s| s.chain_type == ChainType::Ethereum)
        .unwrap();
    assert!(ether.present);
    assert_eq!(
        ether.record.as_ref().map(|r| r.state),
        Some(LifecycleState::Configured)
    );
    let fabric = statuses
        .iter()
        .find(|s| s.chain_type == ChainType::Fabric)
        .unwrap();
    assert!(!fabric.present);

    let versions = pier_lifecycle::orchestrator::versions(fx.repo.path()).unwrap();
    assert_eq!(versions.len(), 3);
    assert_eq!(versions[1].version, "v1.7.0");
    assert_eq!(versions[1].schema.as_deref(), Some("v1.6.1"));
}
