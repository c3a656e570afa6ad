// ABOUTME: Environment provisioner building a fresh isolated runtime per installation.
// ABOUTME: Removes any old environment, creates a venv, upgrades pip, installs the manifest.

mod error;
mod manifest;

pub use error::ProvisionError;
pub use manifest::DependencyManifest;

use std::path::{Path, PathBuf};

use crate::config::RuntimeConfig;
use crate::process::CommandRunner;

/// Environment directory names other tools commonly use. Any of these that
/// holds a virtualenv is removed so only one environment exists per install.
const KNOWN_ENV_DIRS: &[&str] = &[".venv", "venv", "env"];

/// Summary of a successful provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub environment: PathBuf,
    pub requirements: usize,
    pub removed: Vec<PathBuf>,
}

/// Builds the runtime environment inside an installation directory.
pub struct EnvironmentProvisioner<R: CommandRunner> {
    runner: R,
    python: String,
    venv_dir: String,
    manifest: String,
}

impl<R: CommandRunner> EnvironmentProvisioner<R> {
    pub fn new(runner: R, config: &RuntimeConfig) -> Self {
        Self {
            runner,
            python: config.python.clone(),
            venv_dir: config.venv_dir.clone(),
            manifest: config.manifest.clone(),
        }
    }

    pub fn environment_dir(&self, install_dir: &Path) -> PathBuf {
        install_dir.join(&self.venv_dir)
    }

    pub fn manifest_path(&self, install_dir: &Path) -> PathBuf {
        install_dir.join(&self.manifest)
    }

    /// Recreate the environment from scratch and install the manifest into it.
    ///
    /// On installer failure the partial environment is left for inspection.
    pub async fn provision(&self, install_dir: &Path) -> Result<ProvisionReport, ProvisionError> {
        let manifest_path = self.manifest_path(install_dir);
        let manifest = DependencyManifest::load(&manifest_path)?;

        let removed = self.remove_environments(install_dir)?;

        let env_dir = self.environment_dir(install_dir);
        let env_str = env_dir.to_string_lossy().into_owned();
        self.run_step("creating environment", &self.python, &["-m", "venv", &env_str])
            .await?;

        let env_python = env_dir.join("bin").join("python");
        let env_python = env_python.to_string_lossy().into_owned();
        self.run_step(
            "upgrading pip",
            &env_python,
            &["-m", "pip", "install", "--upgrade", "pip"],
        )
        .await?;

        if manifest.is_empty() {
            tracing::info!("{} declares no dependencies", manifest_path.display());
        } else {
            let manifest_str = manifest_path.to_string_lossy().into_owned();
            self.run_step(
                "installing dependencies",
                &env_python,
                &["-m", "pip", "install", "-r", &manifest_str],
            )
            .await?;
        }

        tracing::info!(
            "Provisioned {} with {} requirement(s)",
            env_dir.display(),
            manifest.requirements.len()
        );

        Ok(ProvisionReport {
            environment: env_dir,
            requirements: manifest.requirements.len(),
            removed,
        })
    }

    /// Delete the configured environment and any other virtualenv found
    /// under a well-known name.
    fn remove_environments(&self, install_dir: &Path) -> Result<Vec<PathBuf>, ProvisionError> {
        let mut removed = Vec::new();

        let configured = self.environment_dir(install_dir);
        let others = KNOWN_ENV_DIRS
            .iter()
            .filter(|name| **name != self.venv_dir)
            .map(|name| install_dir.join(name))
            .filter(|dir| dir.join("pyvenv.cfg").is_file());

        for dir in std::iter::once(configured).chain(others) {
            if std::fs::symlink_metadata(&dir).is_err() {
                continue;
            }
            let result = if dir.is_dir() {
                std::fs::remove_dir_all(&dir)
            } else {
                std::fs::remove_file(&dir)
            };
            result.map_err(|source| ProvisionError::RemoveEnvironment {
                path: dir.clone(),
                source,
            })?;
            tracing::info!("Removed environment {}", dir.display());
            removed.push(dir);
        }

        Ok(removed)
    }

    async fn run_step(
        &self,
        step: &'static str,
        program: &str,
        args: &[&str],
    ) -> Result<(), ProvisionError> {
        tracing::debug!("Provisioning: {}", step);
        let output = self
            .runner
            .run(program, args)
            .await
            .map_err(|source| ProvisionError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !output.success() {
            return Err(ProvisionError::CommandFailed {
                step,
                code: output.exit_code,
                message: output.diagnostic(),
            });
        }
        Ok(())
    }
}
