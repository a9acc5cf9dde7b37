//! albumcam Daemon - scheduled capture and upload service
//!
//! Runs as a systemd service. Exit status:
//!
//! - `0` after SIGINT/SIGTERM
//! - `77` when the upload credential expired and the daemon halted
//! - `1` when startup fails (bad config, unwritable log file)
//!
//! Units should set `RestartPreventExitStatus=77` so a halted daemon is
//! not restarted before the credential has been renewed.

use std::{path::PathBuf, process::ExitCode};

use albumcam_core::config::Config;
use albumcam_daemon::{
    logging,
    runner::{RunOutcome, Scheduler},
    service,
};
use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const STARTUP_FAILURE_EXIT_CODE: u8 = 1;

#[derive(Debug, Parser)]
#[command(name = "albumcamd")]
#[command(version, about = "Captures camera images on a schedule and uploads them to Google Photos")]
struct Args {
    /// Path to config file (default: ~/.config/albumcam/config.yaml)
    #[arg(short, long, env = "ALBUMCAM_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Loads and validates the configuration
///
/// An explicitly given file must exist. Without `--config`, a missing
/// default file falls back to built-in defaults.
fn load_config(explicit: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let (config, path) = match explicit {
        Some(path) => (Config::load(&path)?, path),
        None => {
            let path = Config::default_path();
            let config = if path.exists() {
                Config::load(&path)?
            } else {
                Config::default()
            };
            (config, path)
        }
    };

    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(|e| format!("  {e}")).collect();
        anyhow::bail!(
            "Invalid configuration in {}:\n{}",
            path.display(),
            details.join("\n")
        );
    }
    Ok((config, path))
}

/// Waits for SIGTERM or SIGINT and cancels the token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

async fn run(args: Args) -> Result<RunOutcome> {
    let (config, config_path) = load_config(args.config)?;
    logging::init(&config.logging, args.verbose)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config_path = %config_path.display(),
        "albumcam daemon starting (albumcamd)"
    );

    if !config.camera.enabled {
        warn!("camera.use is false, nothing to schedule");
        return Ok(RunOutcome::ScheduleExhausted);
    }

    let schedule = config
        .camera
        .scheduler
        .to_schedule()
        .context("Invalid camera.scheduler")?;
    let mut controller = service::build_controller(&config)?;

    match controller.recover_leftovers(&config.camera.photo_dir).await {
        Ok(0) => {}
        Ok(adopted) => info!(adopted, "Queued images left over from a previous run"),
        Err(e) => warn!(
            photo_dir = %config.camera.photo_dir.display(),
            error = %e,
            "Failed to scan photo directory for leftover images"
        ),
    }

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let outcome = Scheduler::new(schedule, shutdown).run(&mut controller).await;
    match outcome {
        RunOutcome::Halted => error!(
            exit_code = outcome.exit_code(),
            "albumcam daemon halted, renew the credential with `albumcam auth login`"
        ),
        _ => info!("albumcam daemon shut down gracefully"),
    }
    Ok(outcome)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            eprintln!("albumcamd: {e:#}");
            ExitCode::from(STARTUP_FAILURE_EXIT_CODE)
        }
    }
}
