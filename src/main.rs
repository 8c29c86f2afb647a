//! Task-Mind - browser automation control plane
//!
//! Entry point for the `taskmind` CLI and background service.

mod cli;
mod cmd_audit;
mod cmd_context;
mod cmd_daemon;
mod cmd_recipe;
mod server;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::{debug, warn};

use taskmind_config::{Config, ConfigLoader, ConfigValidator};

use crate::cli::{Cli, Commands};

/// Load the config file, or defaults when it does not exist.
fn load_config(path: &Path) -> anyhow::Result<Config> {
    let path = PathBuf::from(ConfigLoader::expand_path(&path.to_string_lossy()));
    if !path.exists() {
        return Ok(Config::default());
    }
    ConfigLoader::load(&path).with_context(|| format!("failed to load {}", path.display()))
}

/// Reject invalid configurations; log warnings.
fn validate_config(config: &Config) -> anyhow::Result<()> {
    let result = ConfigValidator::validate(config)?;
    for warning in &result.warnings {
        warn!("config {}: {}", warning.path, warning.message);
    }
    if !result.is_valid() {
        let errors: Vec<String> = result
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect();
        bail!("invalid configuration:\n  {}", errors.join("\n  "));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    let log_dir = cli.log_file.then(|| config.workspace.root.join("logs"));
    server::init_tracing(log_dir.as_deref())?;
    validate_config(&config)?;
    debug!(config = %cli.config.display(), "Configuration loaded");

    match cli.command {
        Commands::Serve { port } => {
            let mut config = config;
            if let Some(port) = port {
                config.server.port = port;
            }
            server::run_server(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Stop => cmd_daemon::stop(config.server).await,
        Commands::Status => cmd_daemon::status(config.server),
        Commands::Audit { legacy, json } => cmd_audit::audit(&config.commands, &legacy, json),
        Commands::Recipe { action } => cmd_recipe::handle_recipe_command(&config, action).await,
        Commands::Context { action } => cmd_context::handle_context_command(&config.workspace, action).await,
    }
}
