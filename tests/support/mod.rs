// ABOUTME: Test support utilities.
// ABOUTME: Fake venv/pip runner, recording supervisor, release builders, and host fixtures.

#![allow(dead_code)]

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use handover::config::Config;
use handover::process::{CommandOutput, CommandRunner};
use handover::supervisor::{
    ServiceState, ServiceStatus, StopOutcome, Supervisor, SupervisorError,
};
use handover::types::ServiceName;
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter =
            EnvFilter::from_default_env().add_directive("handover=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

// =============================================================================
// Command runner
// =============================================================================

/// Simulates `python -m venv` and `pip` on the real filesystem.
///
/// `pip install -r` appends every requirement to `<venv>/installed.txt`, so an
/// environment that was not recreated accumulates packages.
#[derive(Default)]
pub struct FakeRunner {
    calls: Mutex<Vec<String>>,
    fail_install: AtomicBool,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_install(&self, fail: bool) {
        self.fail_install.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

/// Packages recorded in an environment by [`FakeRunner`].
pub fn installed_packages(venv: &Path) -> Vec<String> {
    fs::read_to_string(venv.join("installed.txt"))
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[&str]) -> std::io::Result<CommandOutput> {
        self.calls
            .lock()
            .push(format!("{} {}", program, args.join(" ")));

        match args {
            ["-m", "venv", dir] => {
                let dir = Path::new(dir);
                fs::create_dir_all(dir.join("bin"))?;
                fs::write(dir.join("pyvenv.cfg"), "home = /usr/bin\n")?;
                fs::write(dir.join("bin/python"), "")?;
                Ok(CommandOutput::with_code(0))
            }
            ["-m", "pip", "install", "--upgrade", "pip"] => Ok(CommandOutput::with_code(0)),
            ["-m", "pip", "install", "-r", manifest] => {
                if self.fail_install.load(Ordering::SeqCst) {
                    return Ok(CommandOutput {
                        exit_code: Some(1),
                        stdout: String::new(),
                        stderr: "ERROR: Could not find a version that satisfies the requirement"
                            .to_string(),
                    });
                }
                let venv = Path::new(program)
                    .parent()
                    .and_then(Path::parent)
                    .ok_or_else(|| std::io::Error::other("interpreter outside a venv"))?;
                let mut installed = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(venv.join("installed.txt"))?;
                for line in fs::read_to_string(manifest)?.lines() {
                    let line = line.trim();
                    if !line.is_empty() && !line.starts_with('#') {
                        writeln!(installed, "{}", line)?;
                    }
                }
                Ok(CommandOutput::with_code(0))
            }
            _ => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("unexpected command: {} {:?}", program, args),
            )),
        }
    }
}

// =============================================================================
// Supervisor
// =============================================================================

/// Records every supervisor call and tracks whether the service runs.
pub struct MockSupervisor {
    calls: Mutex<Vec<String>>,
    running: AtomicBool,
    fail_start: AtomicBool,
    reported_state: Mutex<Option<ServiceState>>,
    unit_path: PathBuf,
    active_unit: Mutex<Option<String>>,
}

impl MockSupervisor {
    /// `unit_path` is read at start time to capture the active unit definition.
    pub fn new(unit_path: PathBuf) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            fail_start: AtomicBool::new(false),
            reported_state: Mutex::new(None),
            unit_path,
            active_unit: Mutex::new(None),
        }
    }

    pub fn running(self) -> Self {
        self.running.store(true, Ordering::SeqCst);
        self
    }

    pub fn fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    /// Report this state from `status` regardless of start/stop.
    pub fn report_state(&self, state: ServiceState) {
        *self.reported_state.lock() = Some(state);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Unit definition the supervisor had loaded at the last start.
    pub fn active_unit(&self) -> Option<String> {
        self.active_unit.lock().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().push(call.to_string());
    }
}

#[async_trait]
impl Supervisor for MockSupervisor {
    async fn stop(&self, _service: &ServiceName) -> Result<StopOutcome, SupervisorError> {
        self.record("stop");
        if self.running.swap(false, Ordering::SeqCst) {
            Ok(StopOutcome::Stopped)
        } else {
            Ok(StopOutcome::NotRunning)
        }
    }

    async fn start(&self, _service: &ServiceName) -> Result<(), SupervisorError> {
        self.record("start");
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(SupervisorError::CommandFailed {
                program: "systemctl".to_string(),
                action: "start".to_string(),
                code: Some(1),
                message: "Job for mybot.service failed".to_string(),
            });
        }
        *self.active_unit.lock() = fs::read_to_string(&self.unit_path).ok();
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn enable(&self, _service: &ServiceName) -> Result<(), SupervisorError> {
        self.record("enable");
        Ok(())
    }

    async fn reload_configuration(&self) -> Result<(), SupervisorError> {
        self.record("reload");
        Ok(())
    }

    async fn status(&self, service: &ServiceName) -> Result<ServiceStatus, SupervisorError> {
        self.record("status");
        let reported = *self.reported_state.lock();
        let state = reported.unwrap_or(if self.is_running() {
            ServiceState::Running
        } else {
            ServiceState::Stopped
        });
        Ok(ServiceStatus {
            state,
            detail: format!("{} - {}", service.unit_name(), state),
        })
    }
}

// =============================================================================
// Releases and hosts
// =============================================================================

/// Contents of one release, rooted at a single top-level directory.
pub struct ReleaseSpec {
    pub root: String,
    pub files: Vec<(String, String)>,
}

impl ReleaseSpec {
    /// A complete release of `mybot` at `version` for an installation at `install_dir`.
    pub fn mybot(version: &str, install_dir: &Path) -> Self {
        Self {
            root: "mybot".to_string(),
            files: vec![
                ("requirements.txt".to_string(), requirements(version)),
                (
                    "mybot.service".to_string(),
                    unit_template(version, install_dir),
                ),
                ("bot.py".to_string(), format!("VERSION = '{version}'\n")),
            ],
        }
    }

    pub fn with_file(mut self, path: &str, body: &str) -> Self {
        self.files.push((path.to_string(), body.to_string()));
        self
    }

    pub fn without(mut self, path: &str) -> Self {
        self.files.retain(|(p, _)| p != path);
        self
    }

    /// Write the release as a gzipped tarball at `path`.
    pub fn write(&self, path: &Path) -> PathBuf {
        let file = fs::File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, body) in &self.files {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(
                    &mut header,
                    format!("{}/{}", self.root, name),
                    body.as_bytes(),
                )
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
        path.to_path_buf()
    }
}

pub fn requirements(version: &str) -> String {
    format!("# mybot {version}\npython-telegram-bot==21.0\npython-dotenv>=1.0\n")
}

pub fn unit_template(version: &str, install_dir: &Path) -> String {
    let dir = install_dir.display();
    format!(
        "[Unit]\nDescription=mybot {version}\n\n[Service]\nUser=mybot\n\
         WorkingDirectory={dir}\nExecStart={dir}/.venv/bin/python bot.py\n\
         Restart=on-failure\n\n[Install]\nWantedBy=multi-user.target\n"
    )
}

/// A throwaway host layout: `<root>/opt/mybot`, `<root>/units`, `<root>/releases`.
pub struct Host {
    pub root: tempfile::TempDir,
    pub config: Config,
}

impl Host {
    pub fn new() -> Self {
        init_tracing();
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("opt")).unwrap();
        fs::create_dir_all(root.path().join("releases")).unwrap();

        let yaml = format!(
            "service: mybot\ninstall_dir: {}\nunit:\n  dir: {}\n",
            root.path().join("opt/mybot").display(),
            root.path().join("units").display()
        );
        let mut config = Config::from_yaml(&yaml).unwrap();
        config.base_dir = root.path().join("releases");

        Self { root, config }
    }

    pub fn install_dir(&self) -> PathBuf {
        self.config.install_dir()
    }

    pub fn venv(&self) -> PathBuf {
        self.install_dir().join(".venv")
    }

    pub fn unit_path(&self) -> PathBuf {
        self.root.path().join("units/mybot.service")
    }

    pub fn supervisor(&self) -> MockSupervisor {
        MockSupervisor::new(self.unit_path())
    }

    /// A complete `mybot` release targeting this host.
    pub fn mybot(&self, version: &str) -> ReleaseSpec {
        ReleaseSpec::mybot(version, &self.install_dir())
    }

    /// Write a release into the releases directory and return its path.
    pub fn release(&self, file_name: &str, spec: &ReleaseSpec) -> PathBuf {
        spec.write(&self.root.path().join("releases").join(file_name))
    }

    /// Backup directories next to the installation, sorted by name.
    pub fn backups(&self) -> Vec<PathBuf> {
        let mut backups: Vec<PathBuf> = fs::read_dir(self.root.path().join("opt"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("mybot-backup-"))
            })
            .collect();
        backups.sort();
        backups
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.install_dir().join(relative)).unwrap()
    }
}
