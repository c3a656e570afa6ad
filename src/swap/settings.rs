// ABOUTME: Carries the operator's settings file into a freshly unpacked installation.
// ABOUTME: Never overwrites a settings file the new release already ships.

use std::path::{Path, PathBuf};

use super::backup::BackupSet;

/// Where the new installation's settings file came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsCarry {
    /// The release already contains a settings file.
    Present,
    /// Copied from a backup or the legacy path.
    CopiedFrom(PathBuf),
    /// No source found; the installation runs without one.
    NotFound,
}

/// Copy `file` into `install_dir` from the newest backup, falling back to
/// `legacy`. Older backups are never consulted.
pub fn carry_forward(
    install_dir: &Path,
    file: &str,
    backups: &BackupSet,
    legacy: Option<&Path>,
) -> std::io::Result<SettingsCarry> {
    let target = install_dir.join(file);
    if target.exists() {
        return Ok(SettingsCarry::Present);
    }

    let source = backups
        .latest()
        .map(|b| b.path.join(file))
        .filter(|candidate| candidate.is_file())
        .or_else(|| legacy.filter(|p| p.is_file()).map(Path::to_path_buf));

    let Some(source) = source else {
        tracing::info!("No {} to carry forward into {}", file, install_dir.display());
        return Ok(SettingsCarry::NotFound);
    };

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(&source, &target)?;
    tracing::info!("Carried {} forward from {}", file, source.display());

    Ok(SettingsCarry::CopiedFrom(source))
}
