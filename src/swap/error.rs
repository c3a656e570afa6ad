// ABOUTME: Error types for the backup/swap step.
// ABOUTME: Records whether the failure left the canonical path without an installation.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::release::ArtifactError;

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("installation path has no parent directory or name: {0}")]
    InvalidCanonical(PathBuf),

    #[error("installation path exists but is not a directory: {0}")]
    Occupied(PathBuf),

    #[error("failed to inspect installation path {path}: {source}")]
    Inspect {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to scan backups in {path}: {source}")]
    Scan {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to move {from} aside to {to}: {source}")]
    Backup {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to unpack release: {source}")]
    Unpack {
        backup: Option<PathBuf>,
        source: ArtifactError,
    },

    #[error("failed to install unpacked release at {path}: {source}")]
    Install {
        path: PathBuf,
        backup: Option<PathBuf>,
        source: std::io::Error,
    },

    #[error("failed to write release marker: {source}")]
    Marker { source: std::io::Error },

    #[error("failed to carry settings file forward: {source}")]
    Settings { source: std::io::Error },
}

impl SwapError {
    /// The backup holding the previous installation, when the failure
    /// happened after it was moved away from the canonical path.
    pub fn displaced_backup(&self) -> Option<&Path> {
        match self {
            SwapError::Unpack { backup, .. } | SwapError::Install { backup, .. } => {
                backup.as_deref()
            }
            _ => None,
        }
    }

    /// True when the host may be left without any installed version.
    pub fn is_destructive(&self) -> bool {
        self.displaced_backup().is_some()
    }

    /// True when the new tree is already in place at the canonical path.
    pub fn is_post_install(&self) -> bool {
        matches!(
            self,
            SwapError::Marker { .. } | SwapError::Settings { .. } | SwapError::Scan { .. }
        )
    }
}
