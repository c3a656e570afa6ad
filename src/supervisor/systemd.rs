// ABOUTME: systemd implementation of the Supervisor capability.
// ABOUTME: Drives systemctl through a CommandRunner and types its exit codes.

use async_trait::async_trait;
use snafu::ResultExt;

use super::error::{CommandFailedSnafu, SpawnSnafu, SupervisorError};
use super::{ServiceState, ServiceStatus, StopOutcome, Supervisor};
use crate::process::{CommandOutput, CommandRunner};
use crate::types::ServiceName;

/// `systemctl` exit status for "unit not loaded / not found".
const EXIT_UNIT_NOT_FOUND: i32 = 5;

/// Every word `systemctl is-active` prints for a unit it could query.
/// "unknown" is printed by older systemd for units that are not loaded.
const ACTIVE_STATES: &[&str] = &[
    "active",
    "reloading",
    "refreshing",
    "activating",
    "deactivating",
    "maintenance",
    "inactive",
    "failed",
    "unknown",
];

/// Supervisor client that shells out to `systemctl`.
pub struct SystemdSupervisor<R: CommandRunner> {
    runner: R,
    program: String,
}

impl<R: CommandRunner> SystemdSupervisor<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            program: "systemctl".to_string(),
        }
    }

    /// Use a different `systemctl` binary (e.g. a wrapper script).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn systemctl(&self, args: &[&str]) -> Result<CommandOutput, SupervisorError> {
        self.runner
            .run(&self.program, args)
            .await
            .context(SpawnSnafu {
                program: self.program.clone(),
            })
    }

    /// Run a systemctl action that must succeed.
    async fn expect_success(&self, action: &str, args: &[&str]) -> Result<(), SupervisorError> {
        let output = self.systemctl(args).await?;
        if output.success() {
            return Ok(());
        }
        CommandFailedSnafu {
            program: self.program.clone(),
            action,
            code: output.exit_code,
            message: output.diagnostic(),
        }
        .fail()
    }

    /// The unit's `ActiveState` word as printed by `systemctl is-active`.
    ///
    /// Non-zero exit is expected for anything but "active"; the text carries the
    /// state. Output that is not a known state (empty stdout with a D-Bus or
    /// permission error on stderr) is a supervisor failure.
    async fn active_state(&self, unit: &str) -> Result<String, SupervisorError> {
        let output = self.systemctl(&["is-active", unit]).await?;
        let word = output.stdout.trim();
        if ACTIVE_STATES.contains(&word) {
            return Ok(word.to_string());
        }
        CommandFailedSnafu {
            program: self.program.clone(),
            action: "is-active",
            code: output.exit_code,
            message: output.diagnostic(),
        }
        .fail()
    }
}

#[async_trait]
impl<R: CommandRunner> Supervisor for SystemdSupervisor<R> {
    async fn stop(&self, service: &ServiceName) -> Result<StopOutcome, SupervisorError> {
        let unit = service.unit_name();

        // `systemctl stop` blocks until the unit is down, so a unit that is
        // still deactivating gets the stop as well.
        match self.active_state(&unit).await?.as_str() {
            state @ ("inactive" | "failed" | "unknown") => {
                tracing::info!("{} is {}, nothing to stop", unit, state);
                return Ok(StopOutcome::NotRunning);
            }
            _ => {}
        }

        let output = self.systemctl(&["stop", &unit]).await?;
        match output.exit_code {
            Some(0) => Ok(StopOutcome::Stopped),
            Some(EXIT_UNIT_NOT_FOUND) => {
                tracing::warn!("{} disappeared before it could be stopped", unit);
                Ok(StopOutcome::NotRunning)
            }
            code => CommandFailedSnafu {
                program: self.program.clone(),
                action: "stop",
                code,
                message: output.diagnostic(),
            }
            .fail(),
        }
    }

    async fn start(&self, service: &ServiceName) -> Result<(), SupervisorError> {
        self.expect_success("start", &["start", &service.unit_name()])
            .await
    }

    async fn enable(&self, service: &ServiceName) -> Result<(), SupervisorError> {
        self.expect_success("enable", &["enable", &service.unit_name()])
            .await
    }

    async fn reload_configuration(&self) -> Result<(), SupervisorError> {
        self.expect_success("daemon-reload", &["daemon-reload"]).await
    }

    async fn status(&self, service: &ServiceName) -> Result<ServiceStatus, SupervisorError> {
        let unit = service.unit_name();
        let state = ServiceState::from_is_active(&self.active_state(&unit).await?);

        // `status` exits 3 for inactive units and 4 for unknown ones; both still
        // produce a report worth showing.
        let output = self
            .systemctl(&["status", "--no-pager", "--lines=20", &unit])
            .await?;
        let detail = if output.stdout.trim().is_empty() {
            output.stderr.trim().to_string()
        } else {
            output.stdout.trim_end().to_string()
        };

        Ok(ServiceStatus { state, detail })
    }
}
