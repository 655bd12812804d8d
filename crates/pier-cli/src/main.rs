//! pierctl - lifecycle manager for pier relay nodes
//!
//! Brings one pier per appchain (ethereum or fabric) through
//! configure → start → register → deploy-rule → stop → clean, either as a
//! local binary or inside an existing container, and reports what it
//! recorded along the way.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod error;
mod output;

use commands::{inspect, lifecycle, Context};
use config::CliConfig;
use error::CliResult;

/// pierctl application
#[derive(Parser)]
#[command(name = "pierctl")]
#[command(about = "pierctl - lifecycle manager for pier relay nodes", long_about = None)]
#[command(version)]
struct Cli {
    /// Repo root holding release.json, config templates, binaries and instances
    #[arg(long, global = true, env = "PIERCTL_REPO")]
    repo: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PIERCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Output format (table, json, yaml)
    #[arg(short, long, global = true, default_value = "table")]
    output: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, global = true)]
    verbose: bool,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "PIERCTL_LOG")]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Fetch pier and the appchain plugin, then render the pier config
    #[command(alias = "config")]
    Configure(lifecycle::ConfigureArgs),

    /// Start pier (binary) or check its container (container)
    Start(lifecycle::StartArgs),

    /// Register the appchain with the hub
    Register(lifecycle::RegisterArgs),

    /// Upload a validation rule
    #[command(alias = "rule")]
    DeployRule(lifecycle::DeployRuleArgs),

    /// Stop the recorded pier process or container
    Stop(lifecycle::StopArgs),

    /// Stop pier and remove its instance directory
    Clean(lifecycle::CleanArgs),

    /// Show the recorded state of each appchain's pier
    Status,

    /// List supported pier versions
    Versions,
}

fn init_tracing(cli: &Cli) {
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| if cli.verbose { "debug" } else { "warn" }.to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so command output stays clean
    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .without_time()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    let ctx = Context {
        repo_root: config.repo_root(cli.repo)?,
        config,
        format: cli.output,
    };
    tracing::debug!(repo = %ctx.repo_root.display(), "Using repo");

    match cli.command {
        Commands::Configure(args) => lifecycle::configure(args, &ctx).await,
        Commands::Start(args) => lifecycle::start(args, &ctx).await,
        Commands::Register(args) => lifecycle::register(args, &ctx).await,
        Commands::DeployRule(args) => lifecycle::deploy_rule(args, &ctx).await,
        Commands::Stop(args) => lifecycle::stop(args, &ctx).await,
        Commands::Clean(args) => lifecycle::clean(args, &ctx).await,
        Commands::Status => inspect::status(&ctx),
        Commands::Versions => inspect::versions(&ctx),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&e.to_string());
            if let Some(hint) = e.hint() {
                eprintln!("  hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}
