// ABOUTME: Parsed view of a systemd unit definition template.
// ABOUTME: Reads working directory, start command, restart policy, and process owner.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::error::RegisterError;

/// systemd `Restart=` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    No,
    Always,
    OnSuccess,
    OnFailure,
    OnAbnormal,
    OnAbort,
    OnWatchdog,
}

impl FromStr for RestartPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no" => Ok(RestartPolicy::No),
            "always" => Ok(RestartPolicy::Always),
            "on-success" => Ok(RestartPolicy::OnSuccess),
            "on-failure" => Ok(RestartPolicy::OnFailure),
            "on-abnormal" => Ok(RestartPolicy::OnAbnormal),
            "on-abort" => Ok(RestartPolicy::OnAbort),
            "on-watchdog" => Ok(RestartPolicy::OnWatchdog),
            _ => Err(format!("unknown restart policy: {}", s)),
        }
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RestartPolicy::No => "no",
            RestartPolicy::Always => "always",
            RestartPolicy::OnSuccess => "on-success",
            RestartPolicy::OnFailure => "on-failure",
            RestartPolicy::OnAbnormal => "on-abnormal",
            RestartPolicy::OnAbort => "on-abort",
            RestartPolicy::OnWatchdog => "on-watchdog",
        };
        write!(f, "{}", s)
    }
}

/// The `[Service]` settings the rollout cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitDefinition {
    pub working_directory: Option<PathBuf>,
    pub exec_start: String,
    pub restart: Option<RestartPolicy>,
    pub user: Option<String>,
}

impl UnitDefinition {
    /// Parse unit file text. Only the `[Service]` section is read; later
    /// assignments win, and an empty assignment resets the value.
    pub fn parse(text: &str) -> Result<Self, RegisterError> {
        let mut in_service = false;
        let mut working_directory = None;
        let mut exec_start: Option<String> = None;
        let mut restart = None;
        let mut user = None;

        for line in join_continuations(text) {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') {
                in_service = line == "[Service]";
                continue;
            }
            if !in_service {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            let value = (!value.is_empty()).then(|| value.to_string());

            match key.trim() {
                // systemd prefixes like `-` only affect error handling.
                "WorkingDirectory" => {
                    working_directory = value.map(|v| PathBuf::from(v.trim_start_matches('-')));
                }
                "ExecStart" => exec_start = value,
                "Restart" => {
                    restart = value
                        .map(|v| v.parse::<RestartPolicy>())
                        .transpose()
                        .map_err(RegisterError::InvalidUnit)?;
                }
                "User" => user = value,
                _ => {}
            }
        }

        let exec_start = exec_start.ok_or_else(|| {
            RegisterError::InvalidUnit("no ExecStart in [Service] section".to_string())
        })?;

        Ok(UnitDefinition {
            working_directory,
            exec_start,
            restart,
            user,
        })
    }
}

/// Merge lines ending in a backslash with the line that follows.
fn join_continuations(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pending = String::new();
    for raw in text.lines() {
        match raw.strip_suffix('\\') {
            Some(head) => {
                pending.push_str(head);
                pending.push(' ');
            }
            None => {
                pending.push_str(raw);
                lines.push(std::mem::take(&mut pending));
            }
        }
    }
    if !pending.is_empty() {
        lines.push(pending);
    }
    lines
}
