// ABOUTME: Unit definition configuration.
// ABOUTME: Where the template lives in a release and where the supervisor reads units.

use serde::Deserialize;
use std::path::PathBuf;

use crate::types::ServiceName;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UnitConfig {
    /// Template path relative to the installation directory.
    /// Defaults to `<service>.service`.
    #[serde(default)]
    pub template: Option<String>,

    /// Supervisor-managed unit directory.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// `systemctl` binary, for hosts that wrap it.
    #[serde(default)]
    pub systemctl: Option<String>,
}

impl UnitConfig {
    pub fn template_for(&self, service: &ServiceName) -> String {
        self.template
            .clone()
            .unwrap_or_else(|| service.unit_name())
    }

    pub fn unit_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("/etc/systemd/system"))
    }

    pub fn systemctl(&self) -> &str {
        self.systemctl.as_deref().unwrap_or("systemctl")
    }
}
