// ABOUTME: Generic rollout struct parameterized by state marker.
// ABOUTME: Carries the inspected release and a record of what each completed step did.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::diagnostics::Warning;
use crate::provision::ProvisionReport;
use crate::register::{Registration, UnitDefinition};
use crate::release::{ArtifactLayout, ReleaseArtifact};
use crate::supervisor::{ServiceStatus, StopOutcome};
use crate::swap::SwapOutcome;
use crate::types::ServiceName;

/// A release that passed preflight inspection.
#[derive(Debug, Clone)]
pub struct PreparedRelease {
    pub artifact: ReleaseArtifact,
    pub layout: ArtifactLayout,
    pub unit: UnitDefinition,
}

/// What the completed steps of a rollout did.
#[derive(Debug, Clone, Default)]
pub struct RolloutRecord {
    pub stop: Option<StopOutcome>,
    pub swap: Option<SwapOutcome>,
    pub environment: Option<ProvisionReport>,
    pub registration: Option<Registration>,
    pub status: Option<ServiceStatus>,
}

/// A rollout in progress, parameterized by its current state.
///
/// Each transition consumes the rollout and returns it in the next state,
/// so steps cannot be skipped or reordered.
#[derive(Debug)]
pub struct Rollout<S> {
    pub(crate) service: ServiceName,
    pub(crate) canonical: PathBuf,
    pub(crate) release: PreparedRelease,
    pub(crate) record: RolloutRecord,
    pub(crate) _state: PhantomData<S>,
}

impl<S> Rollout<S> {
    pub fn service_name(&self) -> &ServiceName {
        &self.service
    }

    /// Canonical installation directory.
    pub fn install_dir(&self) -> &Path {
        &self.canonical
    }

    pub fn release(&self) -> &PreparedRelease {
        &self.release
    }

    pub fn record(&self) -> &RolloutRecord {
        &self.record
    }

    pub(crate) fn transition<T>(self) -> Rollout<T> {
        Rollout {
            service: self.service,
            canonical: self.canonical,
            release: self.release,
            record: self.record,
            _state: PhantomData,
        }
    }
}

/// Outcome of a rollout that reached DONE.
#[derive(Debug, Clone)]
pub struct RolloutReport {
    pub service: ServiceName,
    pub install_dir: PathBuf,
    pub artifact: String,
    pub digest: String,
    pub record: RolloutRecord,
    /// Non-fatal problems, including a service that did not come up.
    pub warnings: Vec<Warning>,
}

impl RolloutReport {
    /// Where the previous installation was moved, if there was one.
    pub fn backup(&self) -> Option<&Path> {
        self.record.swap.as_ref().and_then(|s| s.backup.as_deref())
    }

    pub fn service_running(&self) -> bool {
        self.record
            .status
            .as_ref()
            .is_some_and(|s| s.state.is_running())
    }
}
