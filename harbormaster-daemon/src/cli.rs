//! CLI argument definitions for the harbormaster daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.
//! Flags override both the config file and `HARBORMASTER_*` environment variables.

use std::path::PathBuf;

use clap::Parser;
use harbormaster_core::config::HarbormasterConfig;

/// Container event listener for a Dokku-style hosting platform.
///
/// Keeps proxy configuration in sync with running application containers
/// and rebuilds applications whose restart budget is exhausted.
#[derive(Parser, Debug, Default)]
#[command(name = "harbormaster")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to harbormaster.toml.
    ///
    /// Without this flag, defaults plus `HARBORMASTER_*` environment variables are used.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Override the Docker socket path.
    #[arg(long)]
    pub docker_socket: Option<String>,

    /// Override the proxy reload subcommand (e.g. nginx:build-config).
    #[arg(long)]
    pub reload_subcommand: Option<String>,

    /// Validate configuration and exit without connecting to Docker.
    #[arg(long)]
    pub validate: bool,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    pub print_config: bool,
}

impl DaemonCli {
    /// Apply flag overrides on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut HarbormasterConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level.clone_from(level);
        }
        if let Some(format) = &self.log_format {
            config.general.log_format.clone_from(format);
        }
        if let Some(socket) = &self.docker_socket {
            config.docker.socket.clone_from(socket);
        }
        if let Some(subcommand) = &self.reload_subcommand {
            config.dispatch.reload_subcommand.clone_from(subcommand);
        }
    }
}
