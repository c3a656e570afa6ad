// ABOUTME: Backup/swap manager replacing the canonical installation with a release.
// ABOUTME: The previous installation is always renamed aside, never deleted.

mod backup;
mod error;
mod settings;

pub use backup::{Backup, BackupSet, next_backup_path};
pub use error::SwapError;
pub use settings::{SettingsCarry, carry_forward};

use chrono::Utc;
use std::path::{Path, PathBuf};

use crate::config::SettingsConfig;
use crate::release::{ArtifactLayout, ReleaseArtifact, ReleaseMarker};

/// Split a canonical installation path into its parent directory and base name.
pub fn install_parts(canonical: &Path) -> Result<(PathBuf, String), SwapError> {
    let invalid = || SwapError::InvalidCanonical(canonical.to_path_buf());
    let parent = canonical.parent().ok_or_else(invalid)?;
    let base = canonical
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(invalid)?;
    Ok((parent.to_path_buf(), base.to_string()))
}

/// Result of a successful swap.
#[derive(Debug, Clone)]
pub struct SwapOutcome {
    /// Where the previous installation now lives, if there was one.
    pub backup: Option<PathBuf>,
    /// The canonical path already held an unfinished install of this release.
    pub resumed: bool,
    pub settings: SettingsCarry,
}

/// Replaces the installation at one canonical path.
#[derive(Debug, Clone)]
pub struct BackupSwap {
    canonical: PathBuf,
    settings_file: String,
    legacy_settings: Option<PathBuf>,
}

impl BackupSwap {
    pub fn new(canonical: impl Into<PathBuf>, settings: &SettingsConfig) -> Self {
        Self {
            canonical: canonical.into(),
            settings_file: settings.file.clone(),
            legacy_settings: settings.legacy_path.clone(),
        }
    }

    pub fn canonical(&self) -> &Path {
        &self.canonical
    }

    pub fn settings_file(&self) -> &str {
        &self.settings_file
    }

    /// Move the current installation aside and unpack `artifact` in its place.
    ///
    /// Unpacking goes through a staging directory next to the canonical path,
    /// so the canonical path either holds a complete tree or nothing.
    pub fn swap(
        &self,
        artifact: &ReleaseArtifact,
        layout: &ArtifactLayout,
    ) -> Result<SwapOutcome, SwapError> {
        let (parent, base) = install_parts(&self.canonical)?;

        let mut backup = None;
        let mut resumed = false;

        match std::fs::symlink_metadata(&self.canonical) {
            Ok(meta) if !meta.is_dir() => {
                return Err(SwapError::Occupied(self.canonical.clone()));
            }
            Ok(_) => {
                if ReleaseMarker::read(&self.canonical)
                    .is_some_and(|marker| marker.is_pending_for(artifact))
                {
                    tracing::info!(
                        "{} already holds an unfinished install of {}, reusing it",
                        self.canonical.display(),
                        artifact.file_name()
                    );
                    resumed = true;
                } else {
                    backup = Some(self.move_aside(&parent, &base)?);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No existing installation at {}", self.canonical.display());
            }
            Err(source) => {
                return Err(SwapError::Inspect {
                    path: self.canonical.clone(),
                    source,
                });
            }
        }

        if !resumed {
            self.unpack(&parent, &base, artifact, layout, backup.as_deref())?;
            ReleaseMarker::pending(artifact)
                .write(&self.canonical)
                .map_err(|source| SwapError::Marker { source })?;
        }

        let backups = BackupSet::scan(&parent, &base).map_err(|source| SwapError::Scan {
            path: parent.clone(),
            source,
        })?;
        let settings = carry_forward(
            &self.canonical,
            &self.settings_file,
            &backups,
            self.legacy_settings.as_deref(),
        )
        .map_err(|source| SwapError::Settings { source })?;

        Ok(SwapOutcome {
            backup,
            resumed,
            settings,
        })
    }

    fn move_aside(&self, parent: &Path, base: &str) -> Result<PathBuf, SwapError> {
        let target = next_backup_path(parent, base, Utc::now());
        std::fs::rename(&self.canonical, &target).map_err(|source| SwapError::Backup {
            from: self.canonical.clone(),
            to: target.clone(),
            source,
        })?;
        tracing::info!(
            "Moved previous installation to {}",
            target.display()
        );
        Ok(target)
    }

    fn unpack(
        &self,
        parent: &Path,
        base: &str,
        artifact: &ReleaseArtifact,
        layout: &ArtifactLayout,
        backup: Option<&Path>,
    ) -> Result<(), SwapError> {
        let staging = parent.join(format!(".{}-staging-{}", base, std::process::id()));
        let install_err = |path: &Path, source: std::io::Error| SwapError::Install {
            path: path.to_path_buf(),
            backup: backup.map(Path::to_path_buf),
            source,
        };

        if staging.exists() {
            // Leftover from an interrupted run with a recycled pid.
            std::fs::remove_dir_all(&staging).map_err(|e| install_err(&staging, e))?;
        }
        std::fs::create_dir_all(&staging).map_err(|e| install_err(&staging, e))?;

        if let Err(source) = artifact.unpack_into(&staging) {
            discard_staging(&staging);
            return Err(SwapError::Unpack {
                backup: backup.map(Path::to_path_buf),
                source,
            });
        }

        let unpacked_root = staging.join(&layout.root);
        if let Err(e) = std::fs::rename(&unpacked_root, &self.canonical) {
            discard_staging(&staging);
            return Err(install_err(&self.canonical, e));
        }
        discard_staging(&staging);

        if layout.root != base {
            tracing::warn!(
                "Release root directory '{}' differs from installation name '{}'",
                layout.root,
                base
            );
        }

        tracing::info!(
            "Unpacked {} into {}",
            artifact.file_name(),
            self.canonical.display()
        );
        Ok(())
    }
}

fn discard_staging(staging: &Path) {
    if let Err(e) = std::fs::remove_dir_all(staging) {
        tracing::warn!(
            "Failed to remove staging directory {}: {}",
            staging.display(),
            e
        );
    }
}
