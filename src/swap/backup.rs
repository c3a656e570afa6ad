// ABOUTME: Discovery and naming of backup directories next to the installation.
// ABOUTME: Backups are never pruned here; removing them is an operator decision.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use crate::types::BackupName;

/// A former installation kept for manual rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub name: BackupName,
    pub path: PathBuf,
}

/// All backups of one canonical installation path, newest first.
#[derive(Debug, Clone)]
pub struct BackupSet {
    backups: Vec<Backup>,
}

impl BackupSet {
    /// Scan `parent` for backups of the installation named `base`.
    ///
    /// A missing parent directory yields an empty set.
    pub fn scan(parent: &Path, base: &str) -> std::io::Result<Self> {
        let mut backups = Vec::new();

        let entries = match std::fs::read_dir(parent) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self { backups });
            }
            Err(e) => return Err(e),
        };

        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Ok(name) = BackupName::parse(base, file_name) {
                backups.push(Backup {
                    name,
                    path: entry.path(),
                });
            }
        }

        backups.sort_by(|a, b| b.name.cmp(&a.name));

        Ok(Self { backups })
    }

    pub fn latest(&self) -> Option<&Backup> {
        self.backups.first()
    }

    /// Find a backup by its directory name.
    pub fn find(&self, name: &str) -> Option<&Backup> {
        self.backups.iter().find(|b| b.name.to_string() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Backup> {
        self.backups.iter()
    }

    pub fn len(&self) -> usize {
        self.backups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backups.is_empty()
    }
}

/// First backup path for `base` at `now` that does not exist yet in `parent`.
///
/// Two backups within the same second get increasing `-N` suffixes.
pub fn next_backup_path(parent: &Path, base: &str, now: DateTime<Utc>) -> PathBuf {
    let mut name = BackupName::new(base, now, 1);
    loop {
        let candidate = parent.join(name.to_string());
        if std::fs::symlink_metadata(&candidate).is_err() {
            return candidate;
        }
        name = name.next_seq();
    }
}
