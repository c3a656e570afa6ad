// ABOUTME: Rollout state marker types for the type state pattern.
// ABOUTME: Zero-sized types enforce valid state transitions at compile time; Phase names them.

use serde::Serialize;
use std::fmt;

/// Initial state: artifact inspected, nothing on the host touched yet.
/// Available actions: `stop()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Idle;

/// Service stopped (or was not running).
/// Available actions: `swap()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Stopped;

/// New release unpacked at the canonical path, old one backed up.
/// Available actions: `provision()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Swapped;

/// Runtime environment built.
/// Available actions: `register()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Provisioned;

/// Unit installed, supervisor reloaded, service enabled.
/// Available actions: `start()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Registered;

/// Start requested.
/// Available actions: `verify()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Started;

/// Status captured.
/// Available actions: `finish()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Verified;

/// Rollout phases as reported to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Idle,
    Stopping,
    Swapping,
    Provisioning,
    Registering,
    Starting,
    Verifying,
    Done,
    Failed,
}

impl Phase {
    /// The working phases in execution order.
    pub const SEQUENCE: [Phase; 6] = [
        Phase::Stopping,
        Phase::Swapping,
        Phase::Provisioning,
        Phase::Registering,
        Phase::Starting,
        Phase::Verifying,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "IDLE",
            Phase::Stopping => "STOPPING",
            Phase::Swapping => "SWAPPING",
            Phase::Provisioning => "PROVISIONING",
            Phase::Registering => "REGISTERING",
            Phase::Starting => "STARTING",
            Phase::Verifying => "VERIFYING",
            Phase::Done => "DONE",
            Phase::Failed => "FAILED",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
