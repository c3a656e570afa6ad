// ABOUTME: Installation marker recording which release an install directory holds.
// ABOUTME: Lets a re-run recognize its own half-finished install instead of backing it up.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::ReleaseArtifact;

/// Marker location relative to the installation directory.
pub const MARKER_PATH: &str = ".handover/release.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerState {
    /// Unpacked, but the rollout has not reached DONE yet.
    Pending,
    /// The rollout that installed this tree completed.
    Complete,
}

impl fmt::Display for MarkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerState::Pending => f.write_str("pending"),
            MarkerState::Complete => f.write_str("complete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseMarker {
    /// Artifact file name the tree was unpacked from.
    pub artifact: String,
    /// SHA-256 of the artifact.
    pub digest: String,
    /// When the tree was unpacked.
    pub deployed_at: DateTime<Utc>,
    pub state: MarkerState,
}

impl ReleaseMarker {
    pub fn pending(artifact: &ReleaseArtifact) -> Self {
        Self {
            artifact: artifact.file_name(),
            digest: artifact.digest().to_string(),
            deployed_at: Utc::now(),
            state: MarkerState::Pending,
        }
    }

    pub fn path(install_dir: &Path) -> PathBuf {
        install_dir.join(MARKER_PATH)
    }

    /// Read the marker of an installation, if it has a readable one.
    pub fn read(install_dir: &Path) -> Option<Self> {
        let path = Self::path(install_dir);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(marker) => Some(marker),
            Err(e) => {
                tracing::warn!("Ignoring unreadable release marker {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn write(&self, install_dir: &Path) -> std::io::Result<()> {
        let path = Self::path(install_dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Whether this marker records an unfinished install of `artifact`.
    pub fn is_pending_for(&self, artifact: &ReleaseArtifact) -> bool {
        self.state == MarkerState::Pending && self.digest == artifact.digest()
    }

    /// Flip the marker in `install_dir` to complete.
    pub fn mark_complete(install_dir: &Path) -> std::io::Result<()> {
        match Self::read(install_dir) {
            Some(mut marker) => {
                marker.state = MarkerState::Complete;
                marker.write(install_dir)
            }
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no release marker in {}", install_dir.display()),
            )),
        }
    }
}
