// ABOUTME: Config scaffolding for new deployments.
// ABOUTME: Creates handover.yml template files.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::ServiceName;

use super::{CONFIG_FILENAME, Config};

const DEFAULT_SERVICE: &str = "my-app";

pub fn init_config(dir: &Path, service: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let service = ServiceName::new(service.unwrap_or(DEFAULT_SERVICE))
        .map_err(|e| Error::InvalidConfig(e.to_string()))?;
    let config = Config::template(service);

    let yaml = generate_template_yaml(&config);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    format!(
        r#"service: {service}
artifact: {service}.tar.gz
install_dir: {install_dir}

runtime:
  python: {python}
  venv_dir: {venv_dir}
  manifest: {manifest}

unit:
  template: {template}
  # dir: /etc/systemd/system
  # systemctl: systemctl

settings:
  file: {settings}
  # Copied into the new installation when no backup carries one
  # legacy_path: /etc/{service}/.env

lock:
  stale_after: 1h
"#,
        service = config.service,
        install_dir = config.install_dir().display(),
        python = config.runtime.python,
        venv_dir = config.runtime.venv_dir,
        manifest = config.runtime.manifest,
        template = config.unit_template(),
        settings = config.settings.file,
    )
}
