// ABOUTME: Deploy command implementation.
// ABOUTME: Runs the rollout controller and explains a failure by how much damage it left.

use handover::config::Config;
use handover::deploy::{DeployErrorKind, RolloutController, RolloutFailure, RolloutReport};
use handover::diagnostics::Warning;
use handover::error::{Error, Result};
use handover::output::{Output, OutputMode};
use handover::process::TokioCommandRunner;
use handover::supervisor::SystemdSupervisor;
use handover::swap::SettingsCarry;
use serde::Serialize;

/// Install the configured release and restart the service.
pub async fn deploy(config: Config, force: bool, mut output: Output) -> Result<()> {
    output.start_timer();
    let artifact = config.artifact_path();

    output.progress(&format!(
        "Deploying {} from {} to {}",
        config.service,
        artifact.display(),
        config.install_dir().display()
    ));

    let supervisor =
        SystemdSupervisor::new(TokioCommandRunner).with_program(config.unit.systemctl());
    let controller = RolloutController::new(&config, &supervisor, TokioCommandRunner).force(force);

    let result = controller
        .run_with(&artifact, |phase| output.phase(phase))
        .await;

    match result {
        Ok(report) => {
            for warning in &report.warnings {
                output.warning(&warning.message);
            }
            print_report(&output, &report);
            output.success(&format!(
                "Deployed {} ({})",
                report.artifact,
                short_digest(&report.digest)
            ));
            Ok(())
        }
        Err(failure) => {
            for warning in &failure.warnings {
                output.warning(&warning.message);
            }
            explain_failure(&output, &failure, &config);
            Err(Error::Rollout(Box::new(failure)))
        }
    }
}

#[derive(Serialize)]
struct DeploySummary<'a> {
    event: &'static str,
    service: &'a str,
    install_dir: String,
    artifact: &'a str,
    digest: &'a str,
    backup: Option<String>,
    resumed: bool,
    settings: String,
    requirements: Option<usize>,
    unit_changed: Option<bool>,
    state: Option<String>,
    warnings: &'a [Warning],
}

fn print_report(output: &Output, report: &RolloutReport) {
    let record = &report.record;
    let settings = match record.swap.as_ref().map(|s| &s.settings) {
        Some(SettingsCarry::Present) => "shipped with release".to_string(),
        Some(SettingsCarry::CopiedFrom(source)) => format!("copied from {}", source.display()),
        Some(SettingsCarry::NotFound) | None => "none".to_string(),
    };
    let summary = DeploySummary {
        event: "report",
        service: report.service.as_str(),
        install_dir: report.install_dir.display().to_string(),
        artifact: &report.artifact,
        digest: &report.digest,
        backup: report.backup().map(|p| p.display().to_string()),
        resumed: record.swap.as_ref().is_some_and(|s| s.resumed),
        settings,
        requirements: record.environment.as_ref().map(|e| e.requirements),
        unit_changed: record.registration.as_ref().map(|r| r.changed),
        state: record.status.as_ref().map(|s| s.state.to_string()),
        warnings: &report.warnings,
    };

    let mut lines = Vec::new();
    match &summary.backup {
        Some(backup) => lines.push(format!("  Previous installation: {}", backup)),
        None if summary.resumed => {
            lines.push("  Resumed an unfinished install of this release".to_string())
        }
        None => lines.push("  No previous installation".to_string()),
    }
    lines.push(format!("  Settings: {}", summary.settings));
    if let Some(n) = summary.requirements {
        lines.push(format!("  Dependencies: {}", n));
    }
    if let Some(status) = &record.status {
        lines.push(format!("  Service: {}", status.state));
        if !status.detail.is_empty() {
            lines.extend(status.detail.lines().map(|l| format!("    {}", l)));
        }
    }

    if output.mode() == OutputMode::Quiet {
        return;
    }
    output.record(&summary, &lines);
}

fn explain_failure(output: &Output, failure: &RolloutFailure, config: &Config) {
    let install_dir = config.install_dir();
    match failure.kind() {
        DeployErrorKind::Destructive => {
            let restore = failure
                .error
                .backup_to_restore()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "the newest backup".to_string());
            output.critical(&format!(
                "{} may be absent. The previous installation is at {}. \
                 Restore it with `handover rollback` or `mv {} {}`.",
                install_dir.display(),
                restore,
                restore,
                install_dir.display()
            ));
        }
        DeployErrorKind::PostInstall => {
            output.progress(&format!(
                "The new release is at {} for inspection and the service was left stopped. \
                 Re-run deploy once fixed, or use `handover rollback`.",
                install_dir.display()
            ));
        }
        DeployErrorKind::Preflight => {
            output.progress("The installed release was not modified.");
        }
        DeployErrorKind::LockHeld => {
            output.progress("Another deploy is in progress. Use --force to break the lock.");
        }
        DeployErrorKind::Lock => {}
    }
}

fn short_digest(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}
