// ABOUTME: Error types for runtime environment provisioning.
// ABOUTME: Separates a missing manifest (preflight) from installer failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("dependency manifest not found: {0}")]
    ManifestMissing(PathBuf),

    #[error("failed to read dependency manifest {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove old environment {path}: {source}")]
    RemoveEnvironment {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to invoke {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{step} failed (exit code {code:?}): {message}")]
    CommandFailed {
        step: &'static str,
        code: Option<i32>,
        message: String,
    },
}

impl ProvisionError {
    /// True when the release itself is unusable, as opposed to the installer failing.
    pub fn is_preflight(&self) -> bool {
        matches!(self, ProvisionError::ManifestMissing(_))
    }
}
