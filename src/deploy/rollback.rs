// ABOUTME: Manual rollback restoring a backup directory to the canonical path.
// ABOUTME: The installation in the way is itself backed up first, never deleted.

use chrono::Utc;
use std::path::{Path, PathBuf};

use crate::diagnostics::{Diagnostics, Warning};
use crate::register::ServiceRegistrar;
use crate::supervisor::{ServiceStatus, Supervisor};
use crate::swap::{BackupSet, SwapError, install_parts, next_backup_path};
use crate::types::ServiceName;

use super::DeployError;

/// Outcome of a manual rollback.
#[derive(Debug, Clone)]
pub struct RollbackReport {
    /// The backup that now lives at the canonical path.
    pub restored: PathBuf,
    /// Where the installation that was replaced went.
    pub displaced: Option<PathBuf>,
    pub status: Option<ServiceStatus>,
}

/// Manual rollback: put a backup back at the canonical path and restart.
///
/// This function:
/// 1. Picks the named backup, or the newest one
/// 2. Stops the service (absence is fine)
/// 3. Moves the current installation aside as a new backup
/// 4. Renames the chosen backup onto the canonical path
/// 5. Re-registers the unit from the restored tree and starts the service
///
/// Rolling back twice in a row returns to the original installation.
///
/// # Errors
///
/// Returns error if:
/// - No backup exists, or the named one is not found
/// - Stopping, moving, registering, or starting fails
pub async fn manual_rollback<V: Supervisor + ?Sized>(
    supervisor: &V,
    registrar: &ServiceRegistrar,
    service: &ServiceName,
    canonical: &Path,
    backup: Option<&str>,
    diag: &mut Diagnostics,
) -> Result<RollbackReport, DeployError> {
    let (parent, base) = install_parts(canonical)?;
    let backups = BackupSet::scan(&parent, &base).map_err(|source| SwapError::Scan {
        path: parent.clone(),
        source,
    })?;

    let chosen = match backup {
        Some(name) => backups
            .find(name)
            .ok_or_else(|| DeployError::BackupNotFound(name.to_string()))?,
        None => backups
            .latest()
            .ok_or_else(|| DeployError::NoBackup(canonical.to_path_buf()))?,
    }
    .path
    .clone();

    supervisor
        .stop(service)
        .await
        .map_err(DeployError::Stop)?;

    let displaced = if std::fs::symlink_metadata(canonical).is_ok() {
        let target = next_backup_path(&parent, &base, Utc::now());
        std::fs::rename(canonical, &target).map_err(|source| DeployError::Restore {
            from: canonical.to_path_buf(),
            to: target.clone(),
            displaced: None,
            source,
        })?;
        tracing::info!("Moved current installation to {}", target.display());
        Some(target)
    } else {
        None
    };

    std::fs::rename(&chosen, canonical).map_err(|source| DeployError::Restore {
        from: chosen.clone(),
        to: canonical.to_path_buf(),
        displaced: displaced.clone(),
        source,
    })?;
    tracing::info!("Restored {} to {}", chosen.display(), canonical.display());

    registrar.register(supervisor, canonical).await?;
    supervisor
        .start(service)
        .await
        .map_err(DeployError::Start)?;

    let status = match supervisor.status(service).await {
        Ok(status) => {
            if !status.state.is_running() {
                diag.warn(Warning::verification(format!(
                    "{} is {} after rollback",
                    service.unit_name(),
                    status.state
                )));
            }
            Some(status)
        }
        Err(e) => {
            diag.warn(Warning::verification(format!(
                "could not query status of {}: {}",
                service.unit_name(),
                e
            )));
            None
        }
    };

    Ok(RollbackReport {
        restored: chosen,
        displaced,
        status,
    })
}
