// ABOUTME: Configuration types and parsing for handover.yml.
// ABOUTME: Handles discovery, defaults, path resolution, and CLI overrides.

mod deserialize;
mod init;
mod lock;
mod runtime;
mod settings;
mod unit;

pub use init::init_config;
pub use lock::LockConfig;
pub use runtime::{DEFAULT_VENV_DIR, RuntimeConfig};
pub use settings::SettingsConfig;
pub use unit::UnitConfig;

use crate::error::{Error, Result};
use crate::types::ServiceName;
use deserialize::deserialize_service_name;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "handover.yml";
pub const CONFIG_FILENAME_ALT: &str = "handover.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".handover/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_service_name")]
    pub service: ServiceName,

    /// Release artifact. Relative paths resolve against the config directory.
    #[serde(default)]
    pub artifact: Option<PathBuf>,

    /// Canonical installation directory.
    #[serde(default)]
    pub install_dir: Option<PathBuf>,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub unit: UnitConfig,

    #[serde(default)]
    pub settings: SettingsConfig,

    #[serde(default)]
    pub lock: LockConfig,

    /// Directory the config was loaded from.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        config.base_dir = path
            .parent()
            .map(|p| {
                if p.ends_with(".handover") {
                    p.parent().unwrap_or(p).to_path_buf()
                } else {
                    p.to_path_buf()
                }
            })
            .unwrap_or_default();
        Ok(config)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, artifact: Option<PathBuf>, install_dir: Option<PathBuf>) -> Self {
        if artifact.is_some() {
            self.artifact = artifact;
        }
        if install_dir.is_some() {
            self.install_dir = install_dir;
        }
        self
    }

    /// Resolved artifact path. Defaults to `<service>.tar.gz` next to the config.
    pub fn artifact_path(&self) -> PathBuf {
        let artifact = self
            .artifact
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.tar.gz", self.service)));
        if artifact.is_absolute() {
            artifact
        } else {
            self.base_dir.join(artifact)
        }
    }

    /// Canonical installation directory. Defaults to `/opt/<service>`.
    pub fn install_dir(&self) -> PathBuf {
        self.install_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("/opt").join(self.service.as_str()))
    }

    /// Unit template path relative to the installation directory.
    pub fn unit_template(&self) -> String {
        self.unit.template_for(&self.service)
    }

    /// Check the values serde cannot validate on its own.
    pub fn validate(&self) -> Result<()> {
        let install_dir = self.install_dir();
        if !install_dir.is_absolute() {
            return Err(Error::InvalidConfig(format!(
                "install_dir must be absolute: {}",
                install_dir.display()
            )));
        }
        if install_dir.parent().is_none() || install_dir.file_name().is_none() {
            return Err(Error::InvalidConfig(format!(
                "install_dir must have a parent directory: {}",
                install_dir.display()
            )));
        }
        Ok(())
    }

    /// A config with every section at its default.
    pub fn template(service: ServiceName) -> Self {
        Config {
            service,
            artifact: None,
            install_dir: None,
            runtime: RuntimeConfig::default(),
            unit: UnitConfig::default(),
            settings: SettingsConfig::default(),
            lock: LockConfig::default(),
            base_dir: PathBuf::new(),
        }
    }
}
