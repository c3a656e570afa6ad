// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands, their arguments, and global output flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "handover")]
#[command(about = "Swap-and-restart deployments for systemd-supervised services")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file (default: discover handover.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Emit JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new handover.yml configuration file
    Init {
        /// Service name
        #[arg(short, long)]
        service: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Install a release and restart the service
    Deploy {
        /// Release artifact (.tar, .tar.gz, .tgz)
        #[arg(short, long)]
        artifact: Option<PathBuf>,

        /// Canonical installation directory
        #[arg(short, long)]
        install_dir: Option<PathBuf>,

        /// Break an existing deploy lock
        #[arg(short, long)]
        force: bool,
    },

    /// Restore a backup to the installation directory and restart the service
    Rollback {
        /// Backup directory name (default: newest)
        #[arg(short, long)]
        backup: Option<String>,

        /// Canonical installation directory
        #[arg(short, long)]
        install_dir: Option<PathBuf>,

        /// Break an existing deploy lock
        #[arg(short, long)]
        force: bool,
    },

    /// Show service status, installed release, and backups
    Status {
        /// Canonical installation directory
        #[arg(short, long)]
        install_dir: Option<PathBuf>,
    },

    /// List backup directories, newest first
    Backups {
        /// Canonical installation directory
        #[arg(short, long)]
        install_dir: Option<PathBuf>,
    },
}
