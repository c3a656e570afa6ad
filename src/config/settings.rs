// ABOUTME: Operator settings file configuration.
// ABOUTME: Names the secrets file carried forward across redeploys.

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct SettingsConfig {
    /// Settings file name inside the installation directory.
    #[serde(default = "default_file")]
    pub file: String,

    /// Fallback copy used when no backup carries the settings file.
    #[serde(default)]
    pub legacy_path: Option<PathBuf>,
}

fn default_file() -> String {
    ".env".to_string()
}

impl Default for SettingsConfig {
    fn default() -> Self {
        SettingsConfig {
            file: default_file(),
            legacy_path: None,
        }
    }
}
