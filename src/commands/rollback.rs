// ABOUTME: Rollback command implementation.
// ABOUTME: Restores a backup directory under the deploy lock and restarts the service.

use handover::config::Config;
use handover::deploy::{DeployErrorKind, DeployLock, manual_rollback};
use handover::diagnostics::{Diagnostics, Warning};
use handover::error::Result;
use handover::output::Output;
use handover::process::TokioCommandRunner;
use handover::register::ServiceRegistrar;
use handover::supervisor::SystemdSupervisor;

/// Restore the newest (or named) backup.
pub async fn rollback(
    config: Config,
    backup: Option<String>,
    force: bool,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let mut diag = Diagnostics::default();
    let install_dir = config.install_dir();

    output.progress(&format!(
        "Rolling back {} at {}",
        config.service,
        install_dir.display()
    ));

    output.progress("  → Acquiring deploy lock...");
    let lock = DeployLock::acquire(
        &install_dir,
        &config.service,
        config.lock.stale_after,
        force,
    )?;
    if let Some(broken) = lock.broken() {
        diag.warn(Warning::lock_broken(format!(
            "broke deploy lock held by {} (pid {}) since {}",
            broken.holder, broken.pid, broken.started_at
        )));
    }

    let supervisor =
        SystemdSupervisor::new(TokioCommandRunner).with_program(config.unit.systemctl());
    let registrar = ServiceRegistrar::new(config.service.clone(), &config.unit);

    output.progress("  → Restoring backup...");
    let report = match manual_rollback(
        &supervisor,
        &registrar,
        &config.service,
        &install_dir,
        backup.as_deref(),
        &mut diag,
    )
    .await
    {
        Ok(report) => report,
        Err(e) => {
            if e.kind() == DeployErrorKind::Destructive
                && let Some(displaced) = e.backup_to_restore()
            {
                output.critical(&format!(
                    "{} may be absent. The installation that was in place is at {}.",
                    install_dir.display(),
                    displaced.display()
                ));
            }
            return Err(e.into());
        }
    };

    if let Err(e) = lock.release() {
        diag.warn(Warning::lock_release(format!(
            "failed to remove deploy lock: {}",
            e
        )));
    }

    if let Some(displaced) = &report.displaced {
        output.progress(&format!(
            "  → Replaced installation kept at {}",
            displaced.display()
        ));
    }
    if let Some(status) = &report.status {
        output.progress(&format!("  → Service: {}", status.state));
    }

    // Emit collected warnings
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    output.success(&format!("Restored {}", report.restored.display()));
    Ok(())
}
