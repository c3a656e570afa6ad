// ABOUTME: Entry point for the handover CLI application.
// ABOUTME: Parses arguments, sets up logging, and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use handover::config::{self, Config};
use handover::error::Result;
use handover::output::{Output, OutputMode};
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = OutputMode::from_flags(cli.quiet, cli.json);
    let result = run(cli, Output::new(mode)).await;

    if let Err(e) = result {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: Output) -> Result<()> {
    let cwd = env::current_dir()?;
    let config_path = cli.config;

    match cli.command {
        Commands::Init { service, force } => {
            let dir = config_path
                .as_deref()
                .and_then(Path::parent)
                .map(Path::to_path_buf)
                .unwrap_or_else(|| cwd.clone());
            config::init_config(&dir, service.as_deref(), force)?;
            output.success(&format!(
                "Created {}",
                dir.join(config::CONFIG_FILENAME).display()
            ));
            Ok(())
        }
        Commands::Deploy {
            artifact,
            install_dir,
            force,
        } => {
            let config = load_config(&cwd, config_path)?.with_overrides(artifact, install_dir);
            config.validate()?;
            commands::deploy(config, force, output).await
        }
        Commands::Rollback {
            backup,
            install_dir,
            force,
        } => {
            let config = load_config(&cwd, config_path)?.with_overrides(None, install_dir);
            config.validate()?;
            commands::rollback(config, backup, force, output).await
        }
        Commands::Status { install_dir } => {
            let config = load_config(&cwd, config_path)?.with_overrides(None, install_dir);
            commands::status(config, output).await
        }
        Commands::Backups { install_dir } => {
            let config = load_config(&cwd, config_path)?.with_overrides(None, install_dir);
            commands::backups(config, output)
        }
    }
}

fn load_config(cwd: &Path, explicit: Option<PathBuf>) -> Result<Config> {
    match explicit {
        Some(path) => Config::load(&path),
        None => Config::discover(cwd),
    }
}
