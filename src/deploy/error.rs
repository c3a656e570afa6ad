// ABOUTME: Error types for rollout operations.
// ABOUTME: Every failure maps onto one kind that tells the operator how bad it is.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use crate::provision::ProvisionError;
use crate::register::RegisterError;
use crate::release::ArtifactError;
use crate::supervisor::SupervisorError;
use crate::swap::SwapError;

/// Who holds a deploy lock.
#[derive(Debug, Clone)]
pub struct LockHolderInfo {
    pub holder: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
}

/// How a failure affects the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    /// Nothing destructive happened; the old installation is untouched.
    Preflight,
    /// The old installation was moved aside and nothing usable replaced it.
    Destructive,
    /// The new installation is on disk but the service was not started.
    PostInstall,
    /// Another rollout holds the deploy lock.
    LockHeld,
    /// The deploy lock could not be managed.
    Lock,
}

/// Errors that can occur during rollout state transitions.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("release artifact rejected: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("unit template rejected: {0}")]
    UnitTemplate(#[source] RegisterError),

    #[error("failed to stop service: {0}")]
    Stop(#[source] SupervisorError),

    #[error(transparent)]
    Swap(#[from] SwapError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Register(#[from] RegisterError),

    #[error("failed to start service: {0}")]
    Start(#[source] SupervisorError),

    #[error("no backup of {0} to roll back to")]
    NoBackup(PathBuf),

    #[error("backup not found: {0}")]
    BackupNotFound(String),

    #[error("failed to restore {from} to {to}: {source}")]
    Restore {
        from: PathBuf,
        to: PathBuf,
        /// Where the installation that was in the way now lives.
        displaced: Option<PathBuf>,
        source: std::io::Error,
    },

    #[error(
        "deploy lock held by {} (pid {}) since {}",
        .0.holder,
        .0.pid,
        .0.started_at
    )]
    LockHeld(LockHolderInfo),

    #[error("deploy lock error: {0}")]
    Lock(String),
}

impl DeployError {
    pub fn lock_held(holder: String, pid: u32, started_at: DateTime<Utc>) -> Self {
        DeployError::LockHeld(LockHolderInfo {
            holder,
            pid,
            started_at,
        })
    }

    pub fn lock_error(message: impl Into<String>) -> Self {
        DeployError::Lock(message.into())
    }

    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Artifact(_)
            | DeployError::UnitTemplate(_)
            | DeployError::Stop(_)
            | DeployError::NoBackup(_)
            | DeployError::BackupNotFound(_) => DeployErrorKind::Preflight,
            DeployError::Swap(e) if e.is_destructive() => DeployErrorKind::Destructive,
            DeployError::Swap(e) if e.is_post_install() => DeployErrorKind::PostInstall,
            DeployError::Swap(_) => DeployErrorKind::Preflight,
            DeployError::Provision(e) if e.is_preflight() => DeployErrorKind::Preflight,
            DeployError::Provision(_) | DeployError::Register(_) | DeployError::Start(_) => {
                DeployErrorKind::PostInstall
            }
            DeployError::Restore { displaced, .. } => match displaced {
                Some(_) => DeployErrorKind::Destructive,
                None => DeployErrorKind::Preflight,
            },
            DeployError::LockHeld(_) => DeployErrorKind::LockHeld,
            DeployError::Lock(_) => DeployErrorKind::Lock,
        }
    }

    pub fn lock_holder_info(&self) -> Option<&LockHolderInfo> {
        match self {
            DeployError::LockHeld(info) => Some(info),
            _ => None,
        }
    }

    /// The backup an operator should restore after a destructive failure.
    pub fn backup_to_restore(&self) -> Option<&Path> {
        match self {
            DeployError::Swap(e) => e.displaced_backup(),
            DeployError::Restore { displaced, .. } => displaced.as_deref(),
            _ => None,
        }
    }
}
