// ABOUTME: Service registrar installing the unit definition with the supervisor.
// ABOUTME: Copies the release's template over the managed unit, reloads, and enables.

mod error;
mod unit;

pub use error::RegisterError;
pub use unit::{RestartPolicy, UnitDefinition};

use std::path::{Path, PathBuf};

use crate::config::UnitConfig;
use crate::supervisor::Supervisor;
use crate::types::ServiceName;

/// Result of a successful registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub unit_path: PathBuf,
    pub definition: UnitDefinition,
    /// False when the installed unit already matched the template.
    pub changed: bool,
}

/// Installs one service's unit definition.
#[derive(Debug, Clone)]
pub struct ServiceRegistrar {
    service: ServiceName,
    template: String,
    unit_dir: PathBuf,
}

impl ServiceRegistrar {
    pub fn new(service: ServiceName, config: &UnitConfig) -> Self {
        Self {
            template: config.template_for(&service),
            unit_dir: config.unit_dir(),
            service,
        }
    }

    /// Template path relative to the installation directory.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Where the supervisor reads this service's unit.
    pub fn unit_path(&self) -> PathBuf {
        self.unit_dir.join(self.service.unit_name())
    }

    /// Read and parse the template from an installation directory.
    pub fn load_template(&self, install_dir: &Path) -> Result<(String, UnitDefinition), RegisterError> {
        let path = install_dir.join(&self.template);
        if !path.is_file() {
            return Err(RegisterError::TemplateMissing(path));
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|source| RegisterError::TemplateRead { path, source })?;
        let definition = UnitDefinition::parse(&text)?;
        Ok((text, definition))
    }

    /// Install the unit from `install_dir`, reload the supervisor and enable the service.
    ///
    /// Safe to repeat: the copy overwrites, and reload/enable are no-ops when
    /// nothing changed.
    pub async fn register<S: Supervisor + ?Sized>(
        &self,
        supervisor: &S,
        install_dir: &Path,
    ) -> Result<Registration, RegisterError> {
        let (text, definition) = self.load_template(install_dir)?;

        let unit_path = self.unit_path();
        let changed = std::fs::read_to_string(&unit_path).map_or(true, |current| current != text);
        if changed {
            self.write_unit(&unit_path, &text)?;
            tracing::info!("Installed unit {}", unit_path.display());
        } else {
            tracing::debug!("{} already up to date", unit_path.display());
        }

        supervisor
            .reload_configuration()
            .await
            .map_err(RegisterError::Reload)?;
        supervisor
            .enable(&self.service)
            .await
            .map_err(RegisterError::Enable)?;

        Ok(Registration {
            unit_path,
            definition,
            changed,
        })
    }

    /// Write through a temporary sibling so the supervisor never reads a torn file.
    fn write_unit(&self, unit_path: &Path, text: &str) -> Result<(), RegisterError> {
        let copy_err = |source| RegisterError::Copy {
            path: unit_path.to_path_buf(),
            source,
        };

        std::fs::create_dir_all(&self.unit_dir).map_err(copy_err)?;
        let tmp = self
            .unit_dir
            .join(format!(".{}.handover-tmp", self.service.unit_name()));
        std::fs::write(&tmp, text).map_err(copy_err)?;
        if let Err(e) = std::fs::rename(&tmp, unit_path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(copy_err(e));
        }
        Ok(())
    }
}
