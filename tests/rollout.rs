// ABOUTME: End-to-end rollout tests against a temporary host layout.
// ABOUTME: Uses a fake installer and a recording supervisor; touches only temp directories.

mod support;

use handover::deploy::{DeployErrorKind, DeployLock, Phase, RolloutController};
use handover::diagnostics::WarningKind;
use handover::supervisor::ServiceState;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use support::{FakeRunner, Host, MockSupervisor, installed_packages, requirements};

fn controller<'a>(
    host: &Host,
    supervisor: &'a MockSupervisor,
    runner: &Arc<FakeRunner>,
) -> RolloutController<'a, MockSupervisor, Arc<FakeRunner>> {
    RolloutController::new(&host.config, supervisor, Arc::clone(runner))
}

/// Install `version` the way a first deployment would, then stop the recording.
async fn install(host: &Host, version: &str) -> MockSupervisor {
    let supervisor = host.supervisor();
    let runner = Arc::new(FakeRunner::new());
    let artifact = host.release(&format!("mybot-{version}.tar.gz"), &host.mybot(version));
    controller(host, &supervisor, &runner)
        .run(&artifact)
        .await
        .unwrap();
    supervisor.clear_calls();
    supervisor
}

#[tokio::test]
async fn fresh_host_installs_and_starts() {
    let host = Host::new();
    let supervisor = host.supervisor();
    let runner = Arc::new(FakeRunner::new());
    let artifact = host.release("mybot-v1.tar.gz", &host.mybot("v1"));

    let report = controller(&host, &supervisor, &runner)
        .run(&artifact)
        .await
        .unwrap();

    assert!(report.backup().is_none());
    assert!(host.backups().is_empty());
    assert!(report.service_running());
    assert!(supervisor.is_running());
    assert_eq!(host.read("bot.py"), "VERSION = 'v1'\n");
    assert!(host.venv().join("pyvenv.cfg").exists());
    assert_eq!(
        supervisor.calls(),
        vec!["stop", "reload", "enable", "start", "status"]
    );
    assert_eq!(
        fs::read_to_string(host.unit_path()).unwrap(),
        support::unit_template("v1", &host.install_dir())
    );
    // Nothing to carry forward on a first install.
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::SettingsMissing)
    );
}

#[tokio::test]
async fn upgrade_keeps_exact_previous_tree_as_backup() {
    let host = Host::new();
    let supervisor = install(&host, "v1").await;
    let v1_bot = host.read("bot.py");
    let v1_requirements = host.read("requirements.txt");

    let runner = Arc::new(FakeRunner::new());
    let artifact = host.release("mybot-v2.tar.gz", &host.mybot("v2"));
    let report = controller(&host, &supervisor, &runner)
        .run(&artifact)
        .await
        .unwrap();

    let backups = host.backups();
    assert_eq!(backups.len(), 1);
    assert_eq!(report.backup(), Some(backups[0].as_path()));
    assert_eq!(fs::read_to_string(backups[0].join("bot.py")).unwrap(), v1_bot);
    assert_eq!(
        fs::read_to_string(backups[0].join("requirements.txt")).unwrap(),
        v1_requirements
    );
    assert_eq!(host.read("bot.py"), "VERSION = 'v2'\n");

    let active = supervisor.active_unit().unwrap();
    assert!(active.contains("Description=mybot v2"));
    assert_eq!(supervisor.calls()[0], "stop");
}

#[tokio::test]
async fn failed_install_leaves_new_tree_and_rerun_resumes() {
    let host = Host::new();
    let supervisor = install(&host, "v1").await;

    let runner = Arc::new(FakeRunner::new());
    runner.fail_install(true);
    let artifact = host.release("mybot-v2.tar.gz", &host.mybot("v2"));

    let failure = controller(&host, &supervisor, &runner)
        .run(&artifact)
        .await
        .unwrap_err();

    assert_eq!(failure.phase, Phase::Provisioning);
    assert_eq!(failure.last_completed, Some(Phase::Swapping));
    assert_eq!(failure.kind(), DeployErrorKind::PostInstall);
    assert!(failure.to_string().starts_with("FAILED at PROVISIONING"));
    assert_eq!(host.read("bot.py"), "VERSION = 'v2'\n");
    assert_eq!(host.backups().len(), 1);
    assert!(!supervisor.calls().contains(&"start".to_string()));
    assert!(!supervisor.is_running());

    runner.fail_install(false);
    let report = controller(&host, &supervisor, &runner)
        .run(&artifact)
        .await
        .unwrap();

    let swap = report.record.swap.as_ref().unwrap();
    assert!(swap.resumed);
    assert!(swap.backup.is_none());
    assert_eq!(host.backups().len(), 1);
    assert!(report.service_running());
}

#[tokio::test]
async fn redeploy_rebuilds_environment_from_scratch() {
    let host = Host::new();
    let supervisor = install(&host, "v1").await;

    let runner = Arc::new(FakeRunner::new());
    let artifact = host.release("mybot-v1-again.tar.gz", &host.mybot("v1"));
    controller(&host, &supervisor, &runner)
        .run(&artifact)
        .await
        .unwrap();

    let expected: Vec<String> = requirements("v1")
        .lines()
        .filter(|l| !l.starts_with('#'))
        .map(str::to_string)
        .collect();
    assert_eq!(installed_packages(&host.venv()), expected);
}

#[tokio::test]
async fn stray_environment_is_removed() {
    let host = Host::new();
    let supervisor = host.supervisor();
    let runner = Arc::new(FakeRunner::new());
    let spec = host
        .mybot("v1")
        .with_file("venv/pyvenv.cfg", "home = /usr/bin\n");
    let artifact = host.release("mybot-v1.tar.gz", &spec);

    let report = controller(&host, &supervisor, &runner)
        .run(&artifact)
        .await
        .unwrap();

    assert!(!host.install_dir().join("venv").exists());
    let environment = report.record.environment.unwrap();
    assert!(environment.removed.contains(&host.install_dir().join("venv")));
}

#[tokio::test]
async fn missing_manifest_fails_before_touching_anything() {
    let host = Host::new();
    let supervisor = install(&host, "v1").await;
    supervisor.clear_calls();

    let runner = Arc::new(FakeRunner::new());
    let artifact = host.release(
        "mybot-broken.tar.gz",
        &host.mybot("v2").without("requirements.txt"),
    );
    let failure = controller(&host, &supervisor, &runner)
        .run(&artifact)
        .await
        .unwrap_err();

    assert_eq!(failure.phase, Phase::Idle);
    assert_eq!(failure.last_completed, None);
    assert_eq!(failure.kind(), DeployErrorKind::Preflight);
    assert!(supervisor.calls().is_empty());
    assert!(runner.calls().is_empty());
    assert!(supervisor.is_running());
    assert_eq!(host.read("bot.py"), "VERSION = 'v1'\n");
    assert!(host.backups().is_empty());
}

#[tokio::test]
async fn unit_without_exec_start_fails_preflight() {
    let host = Host::new();
    let supervisor = host.supervisor();
    let runner = Arc::new(FakeRunner::new());
    let spec = host
        .mybot("v1")
        .without("mybot.service")
        .with_file("mybot.service", "[Service]\nUser=mybot\n");
    let artifact = host.release("mybot-v1.tar.gz", &spec);

    let failure = controller(&host, &supervisor, &runner)
        .run(&artifact)
        .await
        .unwrap_err();

    assert_eq!(failure.phase, Phase::Idle);
    assert_eq!(failure.kind(), DeployErrorKind::Preflight);
    assert!(supervisor.calls().is_empty());
    assert!(!host.install_dir().exists());
}

/// A release whose tree cannot be created: `a` is both a file and a directory.
fn unpackable(host: &Host, version: &str) -> support::ReleaseSpec {
    host.mybot(version)
        .with_file("a", "file\n")
        .with_file("a/b", "nested\n")
}

#[tokio::test]
async fn unpack_failure_after_backup_is_destructive() {
    let host = Host::new();
    let supervisor = install(&host, "v1").await;

    let runner = Arc::new(FakeRunner::new());
    let artifact = host.release("mybot-v2.tar.gz", &unpackable(&host, "v2"));
    let failure = controller(&host, &supervisor, &runner)
        .run(&artifact)
        .await
        .unwrap_err();

    assert_eq!(failure.phase, Phase::Swapping);
    assert_eq!(failure.last_completed, Some(Phase::Stopping));
    assert_eq!(failure.kind(), DeployErrorKind::Destructive);
    assert!(!host.install_dir().exists());

    let backups = host.backups();
    assert_eq!(backups.len(), 1);
    assert_eq!(failure.error.backup_to_restore(), Some(backups[0].as_path()));
    assert_eq!(
        fs::read_to_string(backups[0].join("bot.py")).unwrap(),
        "VERSION = 'v1'\n"
    );
    assert_eq!(supervisor.calls(), vec!["stop"]);
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn unpack_failure_on_fresh_host_is_not_destructive() {
    let host = Host::new();
    let supervisor = host.supervisor();
    let runner = Arc::new(FakeRunner::new());
    let artifact = host.release("mybot-v1.tar.gz", &unpackable(&host, "v1"));

    let failure = controller(&host, &supervisor, &runner)
        .run(&artifact)
        .await
        .unwrap_err();

    assert_eq!(failure.phase, Phase::Swapping);
    assert_eq!(failure.kind(), DeployErrorKind::Preflight);
    assert!(failure.error.backup_to_restore().is_none());
    assert!(!host.install_dir().exists());
    assert!(host.backups().is_empty());
}

#[tokio::test]
async fn missing_artifact_fails_at_idle() {
    let host = Host::new();
    let supervisor = host.supervisor();
    let runner = Arc::new(FakeRunner::new());

    let failure = controller(&host, &supervisor, &runner)
        .run(&host.root.path().join("releases/absent.tar.gz"))
        .await
        .unwrap_err();

    assert_eq!(failure.phase, Phase::Idle);
    assert_eq!(failure.kind(), DeployErrorKind::Preflight);
    assert!(supervisor.calls().is_empty());
}

#[tokio::test]
async fn settings_file_is_carried_forward_unchanged() {
    let host = Host::new();
    let supervisor = install(&host, "v1").await;
    let secrets = "TELEGRAM_TOKEN=123:abc\nADMIN_ID=42\n";
    fs::write(host.install_dir().join(".env"), secrets).unwrap();

    let runner = Arc::new(FakeRunner::new());
    let artifact = host.release("mybot-v2.tar.gz", &host.mybot("v2"));
    let report = controller(&host, &supervisor, &runner)
        .run(&artifact)
        .await
        .unwrap();

    assert_eq!(host.read(".env"), secrets);
    assert!(
        !report
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::SettingsMissing)
    );
}

#[tokio::test]
async fn settings_shipped_in_release_win() {
    let host = Host::new();
    let supervisor = install(&host, "v1").await;
    fs::write(host.install_dir().join(".env"), "OLD=1\n").unwrap();

    let runner = Arc::new(FakeRunner::new());
    let spec = host.mybot("v2").with_file(".env", "NEW=1\n");
    let artifact = host.release("mybot-v2.tar.gz", &spec);
    controller(&host, &supervisor, &runner)
        .run(&artifact)
        .await
        .unwrap();

    assert_eq!(host.read(".env"), "NEW=1\n");
}

#[tokio::test]
async fn service_not_running_after_start_is_only_a_warning() {
    let host = Host::new();
    let supervisor = host.supervisor();
    supervisor.report_state(ServiceState::Failed);
    let runner = Arc::new(FakeRunner::new());
    let artifact = host.release("mybot-v1.tar.gz", &host.mybot("v1"));

    let report = controller(&host, &supervisor, &runner)
        .run(&artifact)
        .await
        .unwrap();

    assert!(!report.service_running());
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::VerificationSoft)
    );
}

#[tokio::test]
async fn start_failure_is_post_install() {
    let host = Host::new();
    let supervisor = host.supervisor();
    supervisor.fail_start(true);
    let runner = Arc::new(FakeRunner::new());
    let artifact = host.release("mybot-v1.tar.gz", &host.mybot("v1"));

    let failure = controller(&host, &supervisor, &runner)
        .run(&artifact)
        .await
        .unwrap_err();

    assert_eq!(failure.phase, Phase::Starting);
    assert_eq!(failure.last_completed, Some(Phase::Registering));
    assert_eq!(failure.kind(), DeployErrorKind::PostInstall);
    assert!(host.unit_path().exists());
}

#[tokio::test]
async fn phases_are_reported_in_order() {
    let host = Host::new();
    let supervisor = host.supervisor();
    let runner = Arc::new(FakeRunner::new());
    let artifact = host.release("mybot-v1.tar.gz", &host.mybot("v1"));

    let mut seen = Vec::new();
    controller(&host, &supervisor, &runner)
        .run_with(&artifact, |phase| seen.push(phase))
        .await
        .unwrap();

    let mut expected = vec![Phase::Idle];
    expected.extend(Phase::SEQUENCE);
    expected.push(Phase::Done);
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn held_lock_refuses_second_rollout() {
    let host = Host::new();
    let supervisor = host.supervisor();
    let runner = Arc::new(FakeRunner::new());
    let artifact = host.release("mybot-v1.tar.gz", &host.mybot("v1"));

    let _held = DeployLock::acquire(
        &host.install_dir(),
        &host.config.service,
        Duration::from_secs(3600),
        false,
    )
    .unwrap();

    let failure = controller(&host, &supervisor, &runner)
        .run(&artifact)
        .await
        .unwrap_err();

    assert_eq!(failure.kind(), DeployErrorKind::LockHeld);
    assert_eq!(failure.phase, Phase::Idle);
    assert!(failure.error.lock_holder_info().is_some());
    assert!(supervisor.calls().is_empty());
}

#[tokio::test]
async fn forced_rollout_breaks_lock_with_warning() {
    let host = Host::new();
    let supervisor = host.supervisor();
    let runner = Arc::new(FakeRunner::new());
    let artifact = host.release("mybot-v1.tar.gz", &host.mybot("v1"));

    let held = DeployLock::acquire(
        &host.install_dir(),
        &host.config.service,
        Duration::from_secs(3600),
        false,
    )
    .unwrap();
    let lock_path = held.path().to_path_buf();
    std::mem::forget(held);

    let report = controller(&host, &supervisor, &runner)
        .force(true)
        .run(&artifact)
        .await
        .unwrap();

    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::LockBroken)
    );
    assert!(!lock_path.exists());
}

#[tokio::test]
async fn rapid_redeploys_get_distinct_backups() {
    let host = Host::new();
    let supervisor = install(&host, "v1").await;

    for version in ["v2", "v3", "v4"] {
        let runner = Arc::new(FakeRunner::new());
        let artifact = host.release(&format!("mybot-{version}.tar.gz"), &host.mybot(version));
        controller(&host, &supervisor, &runner)
            .run(&artifact)
            .await
            .unwrap();
    }

    let backups = host.backups();
    assert_eq!(backups.len(), 3);
    let versions: Vec<String> = backups
        .iter()
        .map(|b| fs::read_to_string(b.join("bot.py")).unwrap())
        .collect();
    for version in ["v1", "v2", "v3"] {
        assert!(versions.contains(&format!("VERSION = '{version}'\n")));
    }
}
