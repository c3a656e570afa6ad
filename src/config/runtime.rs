// ABOUTME: Runtime environment configuration.
// ABOUTME: Interpreter, environment directory name, and dependency manifest location.

use serde::Deserialize;

use super::deserialize::deserialize_plain_name;

/// The one environment directory name this tool creates and removes.
pub const DEFAULT_VENV_DIR: &str = ".venv";

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Interpreter used to create the environment.
    #[serde(default = "default_python")]
    pub python: String,

    /// Environment directory, relative to the installation directory.
    #[serde(
        default = "default_venv_dir",
        deserialize_with = "deserialize_plain_name"
    )]
    pub venv_dir: String,

    /// Dependency manifest, relative to the installation directory.
    #[serde(default = "default_manifest")]
    pub manifest: String,
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_venv_dir() -> String {
    DEFAULT_VENV_DIR.to_string()
}

fn default_manifest() -> String {
    "requirements.txt".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            python: default_python(),
            venv_dir: default_venv_dir(),
            manifest: default_manifest(),
        }
    }
}
