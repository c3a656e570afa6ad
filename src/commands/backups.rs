// ABOUTME: Backups command implementation.
// ABOUTME: Lists backup directories of the installation, newest first.

use handover::config::Config;
use handover::error::Result;
use handover::output::Output;
use serde::Serialize;

use super::scan_backups;

#[derive(Serialize)]
struct BackupEntry {
    name: String,
    path: String,
    taken_at: String,
}

pub fn backups(config: Config, output: Output) -> Result<()> {
    let install_dir = config.install_dir();
    let backups = scan_backups(&install_dir)?;

    if backups.is_empty() {
        output.progress(&format!("No backups of {}", install_dir.display()));
    }

    let entries: Vec<BackupEntry> = backups
        .iter()
        .map(|b| BackupEntry {
            name: b.name.to_string(),
            path: b.path.display().to_string(),
            taken_at: b.name.taken_at().to_rfc3339(),
        })
        .collect();
    let lines: Vec<String> = entries
        .iter()
        .map(|e| format!("{}  {}", e.taken_at, e.path))
        .collect();

    output.record(&entries, &lines);
    Ok(())
}
