//! natmgrd - NAT server mapping lifecycle manager
//!
//! One pass per invocation; schedule it with cron or a systemd timer.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use natmgrd::{
    Config, DescriptionMap, DingTalkNotifier, NatMgr, NatMgrSettings, OperationMode,
    ProcessResult, SshTransport,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Reminds owners of expiring NAT server mappings and removes expired ones
#[derive(Parser, Debug)]
#[command(name = "natmgrd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Operation mode (smart, notify, cleanup)
    #[arg(short = 'm', long, default_value = "smart")]
    mode: String,

    /// Path to the YAML configuration
    #[arg(short = 'c', long, default_value = "configs/config.yaml")]
    config: PathBuf,

    /// Path to the YAML service description map
    #[arg(short = 'd', long, default_value = "configs/description.yaml")]
    desc: PathBuf,

    /// Log level (trace, debug, info, warn, error), overridden by RUST_LOG
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("--- Starting natmgrd ---");

    let (mgr, mode, deadline) = match build(&args) {
        Ok(built) => built,
        Err(e) => {
            error!("Startup failed: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = tokio::select! {
        outcome = mgr.run_with_deadline(mode, deadline) => outcome,
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, abandoning run");
            return ExitCode::FAILURE;
        }
    };

    match outcome {
        Ok(result) => report(&result),
        Err(e) => {
            error!(error = %e, "Run failed");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();
}

fn build(args: &Args) -> Result<(NatMgr, OperationMode, std::time::Duration)> {
    let mode: OperationMode = args
        .mode
        .parse()
        .with_context(|| format!("invalid --mode '{}'", args.mode))?;
    let config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let descriptions = load_descriptions(&args.desc)?;

    info!(
        mode = %mode,
        host = %config.router.host,
        groups = config.dingtalk.groups.len(),
        descriptions = descriptions.len(),
        "Configuration loaded"
    );

    let notifier = DingTalkNotifier::new().context("creating DingTalk notifier")?;
    let mgr = NatMgr::new(
        Arc::new(SshTransport::new(&config.router)),
        Arc::new(notifier),
        config.routing_table(),
        descriptions,
        NatMgrSettings::from_config(&config),
    );
    Ok((mgr, mode, config.orchestrator.timeout()))
}

fn load_descriptions(path: &Path) -> Result<DescriptionMap> {
    if !path.exists() {
        warn!(path = %path.display(), "Description file not found, using address fallbacks");
        return Ok(DescriptionMap::default());
    }
    DescriptionMap::load(path).with_context(|| format!("loading {}", path.display()))
}

fn report(result: &ProcessResult) -> ExitCode {
    info!(
        notified = result.notified,
        deleted = result.deleted,
        errors = result.errors.len(),
        "natmgrd finished"
    );
    for e in &result.errors {
        warn!(error = %e, "Recorded error");
    }
    if result.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
