// ABOUTME: Capability interface for the host service supervisor.
// ABOUTME: Exposes stop/start/enable/reload/status so the rollout never touches ambient state.

mod error;
mod systemd;

pub use error::SupervisorError;
pub use systemd::SystemdSupervisor;

use async_trait::async_trait;
use std::fmt;

use crate::types::ServiceName;

/// Supervisor operations consumed by the rollout.
#[async_trait]
pub trait Supervisor: Send + Sync {
    /// Stop the service. A service that is absent or not running is not an error.
    async fn stop(&self, service: &ServiceName) -> Result<StopOutcome, SupervisorError>;

    /// Start the service.
    async fn start(&self, service: &ServiceName) -> Result<(), SupervisorError>;

    /// Mark the service to start automatically at boot.
    async fn enable(&self, service: &ServiceName) -> Result<(), SupervisorError>;

    /// Re-read unit definitions without restarting unrelated services.
    async fn reload_configuration(&self) -> Result<(), SupervisorError>;

    /// Query the current state and a human-readable status report.
    async fn status(&self, service: &ServiceName) -> Result<ServiceStatus, SupervisorError>;
}

/// What a stop request actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The service was running and has been stopped.
    Stopped,
    /// The service was not running or is unknown to the supervisor.
    NotRunning,
}

/// Service state as reported by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Running,
    Starting,
    Stopped,
    Failed,
    Unknown,
}

impl ServiceState {
    /// Map `systemctl is-active` output onto a state.
    pub fn from_is_active(output: &str) -> Self {
        match output.trim() {
            "active" | "reloading" => ServiceState::Running,
            "activating" => ServiceState::Starting,
            "inactive" | "deactivating" => ServiceState::Stopped,
            "failed" => ServiceState::Failed,
            _ => ServiceState::Unknown,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ServiceState::Running)
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceState::Running => "running",
            ServiceState::Starting => "starting",
            ServiceState::Stopped => "stopped",
            ServiceState::Failed => "failed",
            ServiceState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Status snapshot: coarse state plus the supervisor's own report text.
#[derive(Debug, Clone)]
pub struct ServiceStatus {
    pub state: ServiceState,
    pub detail: String,
}
