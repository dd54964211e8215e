use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use harbormaster_core::error::HarbormasterError;
use harbormaster_daemon::cli::DaemonCli;
use harbormaster_daemon::{logging, metrics_server, resolve_config, wait_for_shutdown_signal};
use harbormaster_reconciler::{
    BollardInspector, ContainerInspector, ReconcilerBuilder, ReconcilerConfig, ShellCommandRunner,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();
    let config = resolve_config(&cli).await?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }
    if cli.validate {
        println!("configuration is valid");
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "harbormaster starting");

    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
    }

    let inspector = match BollardInspector::connect(&config.docker) {
        Ok(inspector) => Arc::new(inspector),
        Err(e) => {
            tracing::error!(error = %e, "api_connect_failed");
            return Err(HarbormasterError::from(e).into());
        }
    };
    if let Err(e) = inspector.ping().await {
        tracing::error!(error = %e, "api_connect_failed");
        return Err(HarbormasterError::from(e).into());
    }

    let runner = Arc::new(ShellCommandRunner::new().with_env(config.dispatch.env.clone()));
    let mut reconciler = ReconcilerBuilder::new()
        .config(ReconcilerConfig::from_core(&config))
        .inspector(inspector)
        .command_runner(runner)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build reconciler: {}", e))?;

    // 이벤트 처리 중 시그널이 오면 진행 중인 명령을 기다리지 않고 종료
    tokio::select! {
        result = reconciler.run() => {
            let Err(e) = result;
            Err(anyhow::Error::new(HarbormasterError::from(e)).context("reconciler stopped"))
        }
        signal = wait_for_shutdown_signal() => {
            tracing::info!(signal = signal?, "shutdown signal received");
            tracing::info!("harbormaster shut down");
            Ok(())
        }
    }
}
