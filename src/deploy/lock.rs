// ABOUTME: Deploy lock to prevent concurrent rollouts against the same installation.
// ABOUTME: Uses atomic file creation next to the canonical path, with holder info as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::swap::install_parts;
use crate::types::ServiceName;

use super::DeployError;

/// Information about who holds a deploy lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
    /// Service being deployed.
    pub service: String,
}

impl LockInfo {
    /// Create new lock info for the current process.
    pub fn new(service: &ServiceName) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            service: service.to_string(),
        }
    }

    /// Check if this lock is older than `stale_after`.
    pub fn is_stale(&self, stale_after: Duration) -> bool {
        let age = Utc::now() - self.started_at;
        age.to_std().is_ok_and(|age| age >= stale_after)
    }

    /// Path to the lock file guarding a canonical installation path.
    pub fn lock_path(canonical: &Path) -> Result<PathBuf, DeployError> {
        let (parent, base) =
            install_parts(canonical).map_err(|e| DeployError::lock_error(e.to_string()))?;
        Ok(parent.join(format!(".{}.handover.lock", base)))
    }
}

/// A held deploy lock that releases on drop.
#[derive(Debug)]
pub struct DeployLock {
    path: PathBuf,
    broken: Option<LockInfo>,
    released: bool,
}

impl DeployLock {
    /// Acquire the deploy lock for `canonical`.
    ///
    /// Returns an error naming the holder if another rollout holds it.
    /// Locks older than `stale_after`, unreadable locks, and any lock when
    /// `force` is set are broken with a warning.
    pub fn acquire(
        canonical: &Path,
        service: &ServiceName,
        stale_after: Duration,
        force: bool,
    ) -> Result<Self, DeployError> {
        let path = LockInfo::lock_path(canonical)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DeployError::lock_error(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let info = LockInfo::new(service);
        if Self::try_create(&path, &info)? {
            return Ok(Self::held(path, None));
        }

        let existing = Self::read_existing(&path);
        match &existing {
            Some(lock) if !force && !lock.is_stale(stale_after) => {
                return Err(DeployError::lock_held(
                    lock.holder.clone(),
                    lock.pid,
                    lock.started_at,
                ));
            }
            Some(lock) => {
                tracing::warn!(
                    "Breaking {} lock held by {} (pid {}) since {}",
                    if force { "forced" } else { "stale" },
                    lock.holder,
                    lock.pid,
                    lock.started_at
                );
            }
            None => tracing::warn!("Lock info unreadable, breaking lock"),
        }

        tracing::debug!("Removing lock at {}", path.display());
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(DeployError::lock_error(format!(
                    "failed to break lock {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        if !Self::try_create(&path, &info)? {
            return Err(DeployError::lock_error(
                "lock acquired by another process during break",
            ));
        }

        let broken = existing.unwrap_or_else(|| LockInfo {
            holder: "unknown".to_string(),
            pid: 0,
            started_at: Utc::now(),
            service: service.to_string(),
        });
        Ok(Self::held(path, Some(broken)))
    }

    fn held(path: PathBuf, broken: Option<LockInfo>) -> Self {
        Self {
            path,
            broken,
            released: false,
        }
    }

    /// Create the lock file if it does not exist. `Ok(false)` means it does.
    fn try_create(path: &Path, info: &LockInfo) -> Result<bool, DeployError> {
        let json = serde_json::to_string(info)
            .map_err(|e| DeployError::lock_error(format!("failed to serialize lock: {}", e)))?;

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => {
                return Err(DeployError::lock_error(format!(
                    "failed to create {}: {}",
                    path.display(),
                    e
                )));
            }
        };
        file.write_all(json.as_bytes())
            .map_err(|e| DeployError::lock_error(format!("failed to write lock: {}", e)))?;
        Ok(true)
    }

    fn read_existing(path: &Path) -> Option<LockInfo> {
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The lock that had to be broken to acquire this one, if any.
    pub fn broken(&self) -> Option<&LockInfo> {
        self.broken.as_ref()
    }

    /// Release the lock.
    pub fn release(mut self) -> std::io::Result<()> {
        self.released = true;
        std::fs::remove_file(&self.path)
    }
}

impl Drop for DeployLock {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = std::fs::remove_file(&self.path)
        {
            tracing::warn!("Failed to remove lock {}: {}", self.path.display(), e);
        }
    }
}
