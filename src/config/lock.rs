// ABOUTME: Deploy lock configuration.
// ABOUTME: Controls when an abandoned lock may be broken automatically.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct LockConfig {
    #[serde(default = "default_stale_after", with = "humantime_serde")]
    pub stale_after: Duration,
}

fn default_stale_after() -> Duration {
    Duration::from_secs(60 * 60)
}

impl Default for LockConfig {
    fn default() -> Self {
        LockConfig {
            stale_after: default_stale_after(),
        }
    }
}
