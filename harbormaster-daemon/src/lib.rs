//! Harbormaster daemon library.
//!
//! Exposes the startup helpers for integration testing.
//! In production, `harbormaster` is used as a binary (main.rs).

pub mod cli;
pub mod logging;
pub mod metrics_server;

use anyhow::Result;
use harbormaster_core::config::HarbormasterConfig;

use crate::cli::DaemonCli;

/// Resolve the effective configuration.
///
/// Precedence, lowest first: built-in defaults, the config file (if `--config`
/// was given), `HARBORMASTER_*` environment variables, CLI flags.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, if the file and
/// environment layers fail validation, or if the CLI flags produce an invalid
/// configuration.
pub async fn resolve_config(cli: &DaemonCli) -> Result<HarbormasterConfig> {
    let mut config = match &cli.config {
        Some(path) => HarbormasterConfig::load(path).await,
        None => HarbormasterConfig::from_env(),
    }
    .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;

    cli.apply_overrides(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    Ok(config)
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
pub async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}
