// ABOUTME: Error types for unit registration.
// ABOUTME: Template problems are distinguished from copy and supervisor failures.

use std::path::PathBuf;
use thiserror::Error;

use crate::supervisor::SupervisorError;

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("unit template not found: {0}")]
    TemplateMissing(PathBuf),

    #[error("failed to read unit template {path}: {source}")]
    TemplateRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid unit definition: {0}")]
    InvalidUnit(String),

    #[error("failed to install unit file {path}: {source}")]
    Copy {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("supervisor failed to reload configuration: {0}")]
    Reload(#[source] SupervisorError),

    #[error("supervisor failed to enable service: {0}")]
    Enable(#[source] SupervisorError),
}

impl RegisterError {
    /// True when the template itself is unusable.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            RegisterError::TemplateMissing(_) | RegisterError::InvalidUnit(_)
        )
    }
}
