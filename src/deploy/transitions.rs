// ABOUTME: State transition methods for rollout orchestration.
// ABOUTME: Each method consumes self and returns the next state on success.

use std::marker::PhantomData;
use std::path::Path;

use crate::diagnostics::{Diagnostics, Warning};
use crate::process::CommandRunner;
use crate::provision::EnvironmentProvisioner;
use crate::register::{ServiceRegistrar, UnitDefinition};
use crate::release::{ReleaseArtifact, ReleaseMarker};
use crate::supervisor::{StopOutcome, Supervisor};
use crate::swap::{BackupSwap, SettingsCarry, install_parts};
use crate::types::ServiceName;

use super::DeployError;
use super::deployment::{PreparedRelease, Rollout, RolloutRecord, RolloutReport};
use super::state::{Idle, Provisioned, Registered, Started, Stopped, Swapped, Verified};

// =============================================================================
// Preflight
// =============================================================================

impl Rollout<Idle> {
    /// Inspect the artifact before anything on the host is touched.
    ///
    /// # Errors
    ///
    /// Returns a preflight error if the artifact is unreadable, lacks the
    /// dependency manifest or unit template, or the template has no start command.
    pub fn prepare(
        service: ServiceName,
        manager: &BackupSwap,
        artifact_path: &Path,
        manifest: &str,
        template: &str,
        diag: &mut Diagnostics,
    ) -> Result<Self, DeployError> {
        let canonical = manager.canonical().to_path_buf();
        let (_, base) = install_parts(&canonical)?;

        let artifact = ReleaseArtifact::open(artifact_path)?;
        let layout = artifact.inspect(&[manifest, template])?;
        let unit_text = artifact.read_entry(&layout, template)?;
        let unit = UnitDefinition::parse(&unit_text).map_err(DeployError::UnitTemplate)?;

        if layout.root != base {
            diag.warn(Warning::root_name(format!(
                "release root directory '{}' will be installed as '{}'",
                layout.root,
                canonical.display()
            )));
        }
        if let Some(dir) = &unit.working_directory
            && dir != &canonical
        {
            diag.warn(Warning::unit_working_dir(format!(
                "unit WorkingDirectory {} is not the installation directory {}",
                dir.display(),
                canonical.display()
            )));
        }

        tracing::info!(
            "Preflight passed for {} ({})",
            artifact.file_name(),
            artifact.digest()
        );

        Ok(Rollout {
            service,
            canonical,
            release: PreparedRelease {
                artifact,
                layout,
                unit,
            },
            record: RolloutRecord::default(),
            _state: PhantomData,
        })
    }

    /// Stop the running service. A service that is not running is fine.
    #[must_use = "rollout state must be used"]
    pub async fn stop<V: Supervisor + ?Sized>(
        mut self,
        supervisor: &V,
    ) -> Result<Rollout<Stopped>, DeployError> {
        let outcome = supervisor
            .stop(&self.service)
            .await
            .map_err(DeployError::Stop)?;
        match outcome {
            StopOutcome::Stopped => tracing::info!("Stopped {}", self.service),
            StopOutcome::NotRunning => tracing::info!("{} was not running", self.service),
        }
        self.record.stop = Some(outcome);
        Ok(self.transition())
    }
}

// =============================================================================
// Stopped -> Swapped
// =============================================================================

impl Rollout<Stopped> {
    /// Move the old installation aside and unpack the release in its place.
    #[must_use = "rollout state must be used"]
    pub fn swap(
        mut self,
        manager: &BackupSwap,
        diag: &mut Diagnostics,
    ) -> Result<Rollout<Swapped>, DeployError> {
        let outcome = manager.swap(&self.release.artifact, &self.release.layout)?;

        match &outcome.settings {
            SettingsCarry::CopiedFrom(source) => {
                tracing::info!("Carried {} forward", source.display());
            }
            SettingsCarry::NotFound => diag.warn(Warning::settings_missing(format!(
                "no {} found for {}; the service runs without one",
                manager.settings_file(),
                self.canonical.display()
            ))),
            SettingsCarry::Present => {}
        }

        self.record.swap = Some(outcome);
        Ok(self.transition())
    }
}

// =============================================================================
// Swapped -> Provisioned
// =============================================================================

impl Rollout<Swapped> {
    /// Build a fresh runtime environment inside the new installation.
    #[must_use = "rollout state must be used"]
    pub async fn provision<R: CommandRunner>(
        mut self,
        provisioner: &EnvironmentProvisioner<R>,
    ) -> Result<Rollout<Provisioned>, DeployError> {
        let report = provisioner.provision(&self.canonical).await?;
        self.record.environment = Some(report);
        Ok(self.transition())
    }
}

// =============================================================================
// Provisioned -> Registered
// =============================================================================

impl Rollout<Provisioned> {
    /// Install the unit definition and make the supervisor pick it up.
    #[must_use = "rollout state must be used"]
    pub async fn register<V: Supervisor + ?Sized>(
        mut self,
        registrar: &ServiceRegistrar,
        supervisor: &V,
    ) -> Result<Rollout<Registered>, DeployError> {
        let registration = registrar.register(supervisor, &self.canonical).await?;
        self.record.registration = Some(registration);
        Ok(self.transition())
    }
}

// =============================================================================
// Registered -> Started
// =============================================================================

impl Rollout<Registered> {
    #[must_use = "rollout state must be used"]
    pub async fn start<V: Supervisor + ?Sized>(
        self,
        supervisor: &V,
    ) -> Result<Rollout<Started>, DeployError> {
        supervisor
            .start(&self.service)
            .await
            .map_err(DeployError::Start)?;
        tracing::info!("Started {}", self.service);
        Ok(self.transition())
    }
}

// =============================================================================
// Started -> Verified
// =============================================================================

impl Rollout<Started> {
    /// Capture the supervisor's view of the service. Never fails: a service
    /// that is not running only produces a warning.
    pub async fn verify<V: Supervisor + ?Sized>(
        mut self,
        supervisor: &V,
        diag: &mut Diagnostics,
    ) -> Rollout<Verified> {
        match supervisor.status(&self.service).await {
            Ok(status) => {
                if !status.state.is_running() {
                    diag.warn(Warning::verification(format!(
                        "{} is {} after start",
                        self.service.unit_name(),
                        status.state
                    )));
                }
                self.record.status = Some(status);
            }
            Err(e) => diag.warn(Warning::verification(format!(
                "could not query status of {}: {}",
                self.service.unit_name(),
                e
            ))),
        }
        self.transition()
    }
}

// =============================================================================
// Verified -> report
// =============================================================================

impl Rollout<Verified> {
    /// Mark the installation complete and produce the report.
    pub fn finish(self, diag: &mut Diagnostics) -> RolloutReport {
        if let Err(e) = ReleaseMarker::mark_complete(&self.canonical) {
            diag.warn(Warning::marker(format!(
                "failed to mark {} complete: {}",
                self.canonical.display(),
                e
            )));
        }

        RolloutReport {
            service: self.service,
            install_dir: self.canonical,
            artifact: self.release.artifact.file_name(),
            digest: self.release.artifact.digest().to_string(),
            record: self.record,
            warnings: Vec::new(),
        }
    }
}
