// ABOUTME: Rollout orchestration using the type state pattern.
// ABOUTME: Exports state markers, the Rollout struct, the controller, lock, and rollback.

mod controller;
mod deployment;
mod error;
mod lock;
mod rollback;
mod state;
mod transitions;

pub use controller::{RolloutController, RolloutFailure};
pub use deployment::{PreparedRelease, Rollout, RolloutRecord, RolloutReport};
pub use error::{DeployError, DeployErrorKind, LockHolderInfo};
pub use lock::{DeployLock, LockInfo};
pub use rollback::{RollbackReport, manual_rollback};
pub use state::{Idle, Phase, Provisioned, Registered, Started, Stopped, Swapped, Verified};
