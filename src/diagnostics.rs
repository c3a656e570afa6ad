// ABOUTME: Diagnostics accumulator for non-fatal warnings during a rollout.
// ABOUTME: Collects warnings that shouldn't fail a deployment but should be shown to users.

use serde::Serialize;

/// Collects non-fatal warnings during rollout operations.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// A non-fatal warning collected during a rollout.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The service did not report running after start.
    pub fn verification(message: impl Into<String>) -> Self {
        Self::new(WarningKind::VerificationSoft, message)
    }

    /// No settings file could be found for the new installation.
    pub fn settings_missing(message: impl Into<String>) -> Self {
        Self::new(WarningKind::SettingsMissing, message)
    }

    /// The unit's working directory is not the installation directory.
    pub fn unit_working_dir(message: impl Into<String>) -> Self {
        Self::new(WarningKind::UnitWorkingDir, message)
    }

    /// The release root directory is named differently from the installation.
    pub fn root_name(message: impl Into<String>) -> Self {
        Self::new(WarningKind::RootName, message)
    }

    /// A stale or forced deploy lock was broken.
    pub fn lock_broken(message: impl Into<String>) -> Self {
        Self::new(WarningKind::LockBroken, message)
    }

    /// Failed to release deploy lock (lock file may remain).
    pub fn lock_release(message: impl Into<String>) -> Self {
        Self::new(WarningKind::LockRelease, message)
    }

    /// The release marker could not be updated.
    pub fn marker(message: impl Into<String>) -> Self {
        Self::new(WarningKind::Marker, message)
    }
}

/// Categories of warnings that can occur during a rollout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    VerificationSoft,
    SettingsMissing,
    UnitWorkingDir,
    RootName,
    LockBroken,
    LockRelease,
    Marker,
}
