// ABOUTME: Error types for release artifact handling.
// ABOUTME: Covers missing files, unsupported formats, bad layouts, and unpack failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("release artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("unsupported artifact format (expected .tar, .tar.gz or .tgz): {0}")]
    UnsupportedFormat(PathBuf),

    #[error("failed to read artifact {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("artifact has no top-level directory")]
    NoRootDirectory,

    #[error("artifact must contain exactly one top-level directory, found: {}", .0.join(", "))]
    MultipleRoots(Vec<String>),

    #[error("artifact top-level entry is a file, not a directory: {0}")]
    RootIsFile(String),

    #[error("artifact is missing {entry} under {root}/")]
    MissingEntry { root: String, entry: String },

    #[error("failed to unpack artifact into {path}: {source}")]
    Unpack {
        path: PathBuf,
        source: std::io::Error,
    },
}
