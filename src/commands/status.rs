// ABOUTME: Status command implementation.
// ABOUTME: Shows supervisor status, the installed release marker, and available backups.

use handover::config::Config;
use handover::error::Result;
use handover::output::Output;
use handover::process::TokioCommandRunner;
use handover::release::ReleaseMarker;
use handover::supervisor::{Supervisor, SystemdSupervisor};
use serde::Serialize;

use super::scan_backups;

#[derive(Serialize)]
struct StatusSummary {
    service: String,
    install_dir: String,
    state: Option<String>,
    release: Option<ReleaseMarker>,
    backups: Vec<String>,
}

pub async fn status(config: Config, output: Output) -> Result<()> {
    let install_dir = config.install_dir();
    let supervisor =
        SystemdSupervisor::new(TokioCommandRunner).with_program(config.unit.systemctl());

    let status = match supervisor.status(&config.service).await {
        Ok(status) => Some(status),
        Err(e) => {
            output.warning(&format!("could not query supervisor: {}", e));
            None
        }
    };
    let marker = ReleaseMarker::read(&install_dir);
    let backups = scan_backups(&install_dir)?;

    let mut lines = vec![
        format!("Service: {}", config.service),
        format!("Installation: {}", install_dir.display()),
    ];
    match &marker {
        Some(m) => lines.push(format!(
            "Release: {} ({}, {}, deployed {})",
            m.artifact,
            m.digest.get(..12).unwrap_or(&m.digest),
            m.state,
            m.deployed_at.format("%Y-%m-%d %H:%M:%S UTC")
        )),
        None if install_dir.exists() => lines.push("Release: unknown (no marker)".to_string()),
        None => lines.push("Release: not installed".to_string()),
    }
    lines.push(format!("Backups: {}", backups.len()));
    if let Some(latest) = backups.latest() {
        lines.push(format!("  newest: {}", latest.path.display()));
    }
    if let Some(status) = &status {
        lines.push(format!("State: {}", status.state));
        lines.extend(status.detail.lines().map(|l| format!("  {}", l)));
    }

    let summary = StatusSummary {
        service: config.service.to_string(),
        install_dir: install_dir.display().to_string(),
        state: status.as_ref().map(|s| s.state.to_string()),
        release: marker,
        backups: backups.iter().map(|b| b.name.to_string()).collect(),
    };
    output.record(&summary, &lines);
    Ok(())
}
