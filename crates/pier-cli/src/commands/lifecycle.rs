//! Lifecycle commands: configure, start, register, deploy-rule, stop, clean

use super::{AppchainArgs, Context, InstanceArgs};
use crate::error::{CliError, CliResult};
use crate::output::{self, print_error, print_info, print_success, print_warning, OutputFormat};
use clap::Args;
use pier_lifecycle::{LifecycleOrchestrator, PierProcess, StopOutcome};
use pier_types::{AppchainEndpoint, PierInstance};
use serde::Serialize;
use std::io::IsTerminal;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ConfigureArgs {
    #[command(flatten)]
    pub instance: InstanceArgs,

    /// Config template to render (default: $repo/pier_config/$schema/pier_modify_config.toml)
    #[arg(long)]
    pub config_path: Option<PathBuf>,

    #[command(flatten)]
    pub appchain: AppchainArgs,
}

#[derive(Debug, Args)]
pub struct StartArgs {
    #[command(flatten)]
    pub instance: InstanceArgs,

    /// Config template; re-renders the instance config when given
    #[arg(long)]
    pub config_path: Option<PathBuf>,

    /// Container ID, checked to be running (container mode)
    #[arg(long)]
    pub cid: Option<String>,

    /// Return once pier is spawned; output goes to $pier_repo/pier.log
    #[arg(short, long)]
    pub detach: bool,

    #[command(flatten)]
    pub appchain: AppchainArgs,
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    #[command(flatten)]
    pub instance: InstanceArgs,

    /// Container ID (container mode)
    #[arg(long)]
    pub cid: Option<String>,

    /// Appchain method, used from pier v1.8.0 on
    #[arg(long, default_value = "appchain")]
    pub method: String,
}

#[derive(Debug, Args)]
pub struct DeployRuleArgs {
    #[command(flatten)]
    pub instance: InstanceArgs,

    /// Container ID (container mode)
    #[arg(long)]
    pub cid: Option<String>,

    /// Rule file (default: $pier_repo/$appchain/validating.wasm)
    #[arg(long)]
    pub rule_repo: Option<PathBuf>,

    /// Appchain method, used from pier v1.8.0 on
    #[arg(long, default_value = "appchain")]
    pub method: String,
}

#[derive(Debug, Args)]
pub struct StopArgs {
    #[command(flatten)]
    pub instance: InstanceArgs,

    /// Container to stop, taking precedence over the record (container mode)
    #[arg(long)]
    pub cid: Option<String>,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub instance: InstanceArgs,

    /// Skip confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Structured form of a start result
#[derive(Debug, Serialize)]
struct StartReport<'a> {
    endpoint: &'a AppchainEndpoint,
    config: Option<&'a PathBuf>,
    pid: Option<u32>,
    attached: bool,
}

pub async fn configure(args: ConfigureArgs, ctx: &Context) -> CliResult<()> {
    let instance = ctx.instance(&args.instance, None, args.config_path);
    let orchestrator = ctx.orchestrator(true)?;

    if matches!(ctx.format, OutputFormat::Table) {
        print_info(&format!(
            "Configuring {} pier {} ({})...",
            instance.chain_type, instance.version, instance.mode
        ));
    }
    let outcome = orchestrator
        .configure(&instance, &args.appchain.input())
        .await?;

    match ctx.format {
        OutputFormat::Table => {
            print_success(&format!("Config written to {}", outcome.config.display()));
            println!("  Schema:   {}", outcome.schema);
            println!("  Address:  {}", outcome.endpoint.address);
            println!("  Ports:    {}", outcome.endpoint.ports.join(","));
            println!("  Binary:   {}", outcome.binary.path.display());
            println!("  Plugin:   {}", outcome.plugin.path.display());
            Ok(())
        }
        format => output::print_single(&outcome, format),
    }
}

pub async fn start(args: StartArgs, ctx: &Context) -> CliResult<()> {
    let instance = ctx.instance(&args.instance, args.cid, args.config_path);
    let orchestrator = ctx.orchestrator(!args.detach)?;

    let outcome = orchestrator
        .start(&instance, &args.appchain.input())
        .await?;

    let report = StartReport {
        endpoint: &outcome.endpoint,
        config: outcome.config.as_ref(),
        pid: outcome.pid,
        attached: outcome.process.is_some(),
    };
    match ctx.format {
        OutputFormat::Table => match outcome.pid {
            Some(pid) => print_success(&format!("pier started (pid {})", pid)),
            None => print_success(&format!("{} pier is up", instance.chain_type)),
        },
        format => output::print_single(&report, format)?,
    }

    if let Some(process) = outcome.process {
        follow(&orchestrator, &instance, process).await?;
    } else if outcome.pid.is_some() && matches!(ctx.format, OutputFormat::Table) {
        print_info(&format!(
            "Output is appended to {}",
            instance.instance_repo.join("pier.log").display()
        ));
    }
    Ok(())
}

/// Stream an attached pier until it exits; Ctrl-C reaches pier through the
/// process group, so keep draining its output until it shuts down
async fn follow(
    orchestrator: &LifecycleOrchestrator,
    instance: &PierInstance,
    process: PierProcess,
) -> CliResult<()> {
    let follow = orchestrator.follow(instance, process);
    tokio::pin!(follow);

    let finished = tokio::select! {
        status = &mut follow => Some(status?),
        _ = tokio::signal::ctrl_c() => None,
    };
    let status = match finished {
        Some(status) => status,
        None => {
            print_warning("Interrupted; waiting for pier to shut down");
            follow.await?
        }
    };

    if status.success() {
        print_success("pier exited");
    } else {
        print_error(&format!("pier exited with {}", status));
    }
    Ok(())
}

pub async fn register(args: RegisterArgs, ctx: &Context) -> CliResult<()> {
    let instance = ctx.instance(&args.instance, args.cid, None);
    let orchestrator = ctx.orchestrator(true)?;

    let outcome = orchestrator.register(&instance, &args.method).await?;
    match ctx.format {
        OutputFormat::Table => {
            print_success(&format!("{} appchain registered", instance.chain_type));
            Ok(())
        }
        format => output::print_single(&outcome, format),
    }
}

pub async fn deploy_rule(args: DeployRuleArgs, ctx: &Context) -> CliResult<()> {
    let instance = ctx.instance(&args.instance, args.cid, None);
    let orchestrator = ctx.orchestrator(true)?;

    let outcome = orchestrator
        .deploy_rule(&instance, args.rule_repo.as_deref(), &args.method)
        .await?;
    match ctx.format {
        OutputFormat::Table => {
            let rule = outcome
                .rule
                .as_ref()
                .map(|r| r.display().to_string())
                .unwrap_or_default();
            print_success(&format!("Rule {} deployed", rule));
            Ok(())
        }
        format => output::print_single(&outcome, format),
    }
}

pub async fn stop(args: StopArgs, ctx: &Context) -> CliResult<()> {
    let instance = ctx.instance(&args.instance, args.cid, None);
    let orchestrator = ctx.orchestrator(true)?;

    let outcome = orchestrator.stop(&instance).await?;
    match ctx.format {
        OutputFormat::Table => {
            report_stop(&outcome);
            Ok(())
        }
        format => output::print_single(&outcome, format),
    }
}

fn report_stop(outcome: &StopOutcome) {
    match outcome {
        StopOutcome::Terminated { pid } => print_success(&format!("pier (pid {}) stopped", pid)),
        StopOutcome::Killed { pid } => {
            print_warning(&format!("pier (pid {}) ignored SIGTERM and was killed", pid))
        }
        StopOutcome::ContainerStopped { container_id } => {
            print_success(&format!("Container {} stopped", container_id))
        }
        StopOutcome::NotRunning => print_info("pier was not running"),
    }
}

pub async fn clean(args: CleanArgs, ctx: &Context) -> CliResult<()> {
    let instance = ctx.instance(&args.instance, None, None);

    if !args.yes {
        let target = instance.instance_repo.display().to_string();
        if !std::io::stdin().is_terminal() {
            return Err(CliError::ConfirmationRequired(target));
        }
        let confirm = dialoguer::Confirm::new()
            .with_prompt(format!("Remove {} and everything in it?", target))
            .default(false)
            .interact()
            .map_err(|_| CliError::ConfirmationRequired(target.clone()))?;

        if !confirm {
            return Err(CliError::Aborted(target));
        }
    }

    let orchestrator = ctx.orchestrator(true)?;
    let outcome = orchestrator.clean(&instance).await?;
    match ctx.format {
        OutputFormat::Table => {
            if outcome.stopped != StopOutcome::NotRunning {
                report_stop(&outcome.stopped);
            }
            match &outcome.removed {
                Some(path) => print_success(&format!("Removed {}", path.display())),
                None => print_warning(&format!(
                    "{} does not exist",
                    instance.instance_repo.display()
                )),
            }
            Ok(())
        }
        format => output::print_single(&outcome, format),
    }
}
