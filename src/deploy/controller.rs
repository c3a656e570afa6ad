// ABOUTME: Rollout controller sequencing every step of a deployment under the deploy lock.
// ABOUTME: Reports a single outcome: DONE with warnings, or FAILED at a named phase.

use std::fmt;
use std::path::Path;

use crate::config::{Config, LockConfig};
use crate::diagnostics::{Diagnostics, Warning};
use crate::process::CommandRunner;
use crate::provision::EnvironmentProvisioner;
use crate::register::ServiceRegistrar;
use crate::supervisor::Supervisor;
use crate::swap::BackupSwap;
use crate::types::ServiceName;

use super::deployment::{Rollout, RolloutReport};
use super::error::{DeployError, DeployErrorKind};
use super::lock::DeployLock;
use super::state::Phase;

/// A rollout that ended in FAILED.
#[derive(Debug)]
pub struct RolloutFailure {
    /// Phase whose operation failed.
    pub phase: Phase,
    /// Last phase that completed, if any did.
    pub last_completed: Option<Phase>,
    pub error: DeployError,
    pub warnings: Vec<Warning>,
}

impl RolloutFailure {
    pub fn kind(&self) -> DeployErrorKind {
        self.error.kind()
    }
}

impl fmt::Display for RolloutFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", Phase::Failed, self.phase)?;
        match self.last_completed {
            Some(last) => write!(f, " (last completed: {})", last)?,
            None => write!(f, " (nothing completed)")?,
        }
        write!(f, ": {}", self.error)
    }
}

impl std::error::Error for RolloutFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Tracks the current phase and notifies the observer on each transition.
struct Progress<'a> {
    current: Phase,
    last_completed: Option<Phase>,
    observe: &'a mut dyn FnMut(Phase),
}

impl Progress<'_> {
    fn advance(&mut self, next: Phase) {
        self.last_completed = Some(self.current);
        self.current = next;
        tracing::info!("Rollout phase {}", next);
        (self.observe)(next);
    }
}

/// Drives one service's rollout from IDLE to DONE.
pub struct RolloutController<'a, V: Supervisor + ?Sized, R: CommandRunner> {
    service: ServiceName,
    supervisor: &'a V,
    provisioner: EnvironmentProvisioner<R>,
    registrar: ServiceRegistrar,
    swap: BackupSwap,
    manifest: String,
    lock: LockConfig,
    force: bool,
}

impl<'a, V: Supervisor + ?Sized, R: CommandRunner> RolloutController<'a, V, R> {
    pub fn new(config: &Config, supervisor: &'a V, runner: R) -> Self {
        Self {
            service: config.service.clone(),
            supervisor,
            provisioner: EnvironmentProvisioner::new(runner, &config.runtime),
            registrar: ServiceRegistrar::new(config.service.clone(), &config.unit),
            swap: BackupSwap::new(config.install_dir(), &config.settings),
            manifest: config.runtime.manifest.clone(),
            lock: config.lock.clone(),
            force: false,
        }
    }

    /// Break any existing deploy lock.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn install_dir(&self) -> &Path {
        self.swap.canonical()
    }

    /// Run the whole rollout.
    pub async fn run(&self, artifact: &Path) -> Result<RolloutReport, RolloutFailure> {
        self.run_with(artifact, |_| {}).await
    }

    /// Run the whole rollout, calling `observe` as each phase begins.
    pub async fn run_with<F: FnMut(Phase)>(
        &self,
        artifact: &Path,
        mut observe: F,
    ) -> Result<RolloutReport, RolloutFailure> {
        let mut diag = Diagnostics::default();
        let mut progress = Progress {
            current: Phase::Idle,
            last_completed: None,
            observe: &mut observe,
        };
        (progress.observe)(Phase::Idle);

        match self.execute(artifact, &mut progress, &mut diag).await {
            Ok(mut report) => {
                report.warnings = diag.into_warnings();
                Ok(report)
            }
            Err(error) => {
                tracing::error!("Rollout failed at {}: {}", progress.current, error);
                let failure = RolloutFailure {
                    phase: progress.current,
                    last_completed: progress.last_completed,
                    error,
                    warnings: diag.into_warnings(),
                };
                (progress.observe)(Phase::Failed);
                Err(failure)
            }
        }
    }

    async fn execute(
        &self,
        artifact: &Path,
        progress: &mut Progress<'_>,
        diag: &mut Diagnostics,
    ) -> Result<RolloutReport, DeployError> {
        let lock = DeployLock::acquire(
            self.swap.canonical(),
            &self.service,
            self.lock.stale_after,
            self.force,
        )?;
        if let Some(broken) = lock.broken() {
            diag.warn(Warning::lock_broken(format!(
                "broke deploy lock held by {} (pid {}) since {}",
                broken.holder, broken.pid, broken.started_at
            )));
        }

        let rollout = Rollout::prepare(
            self.service.clone(),
            &self.swap,
            artifact,
            &self.manifest,
            self.registrar.template(),
            diag,
        )?;

        progress.advance(Phase::Stopping);
        let rollout = rollout.stop(self.supervisor).await?;

        progress.advance(Phase::Swapping);
        let rollout = rollout.swap(&self.swap, diag)?;

        progress.advance(Phase::Provisioning);
        let rollout = rollout.provision(&self.provisioner).await?;

        progress.advance(Phase::Registering);
        let rollout = rollout.register(&self.registrar, self.supervisor).await?;

        progress.advance(Phase::Starting);
        let rollout = rollout.start(self.supervisor).await?;

        progress.advance(Phase::Verifying);
        let rollout = rollout.verify(self.supervisor, diag).await;

        progress.advance(Phase::Done);
        let report = rollout.finish(diag);

        if let Err(e) = lock.release() {
            diag.warn(Warning::lock_release(format!(
                "failed to remove deploy lock: {}",
                e
            )));
        }

        Ok(report)
    }
}
