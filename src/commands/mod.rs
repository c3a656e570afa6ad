// ABOUTME: Command module aggregator for the handover CLI.
// ABOUTME: Re-exports deploy, rollback, status, and backups command handlers.

mod backups;
mod deploy;
mod rollback;
mod status;

pub use backups::backups;
pub use deploy::deploy;
pub use rollback::rollback;
pub use status::status;

use handover::deploy::DeployError;
use handover::error::Result;
use handover::swap::{BackupSet, install_parts};
use std::path::Path;

/// Backups of the installation at `install_dir`, newest first.
fn scan_backups(install_dir: &Path) -> Result<BackupSet> {
    let (parent, base) = install_parts(install_dir).map_err(DeployError::from)?;
    Ok(BackupSet::scan(&parent, &base)?)
}
