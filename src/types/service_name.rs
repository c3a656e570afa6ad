// ABOUTME: Supervisor-safe service name validation.
// ABOUTME: Ensures names are usable as systemd unit names without escaping.

use std::fmt;
use thiserror::Error;

/// Longest name accepted, leaving room for the `.service` suffix.
const MAX_LEN: usize = 200;

const UNIT_SUFFIX: &str = ".service";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceNameError {
    #[error("service name cannot be empty")]
    Empty,

    #[error("service name exceeds maximum length of {MAX_LEN} characters")]
    TooLong,

    #[error("service name cannot start with a hyphen or dot")]
    BadLeadingChar,

    #[error("service name must not include the '{UNIT_SUFFIX}' suffix")]
    HasUnitSuffix,

    #[error("invalid character in service name: '{0}'")]
    InvalidChar(char),
}

/// Name of the supervised service, without the unit suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(value: &str) -> Result<Self, ServiceNameError> {
        if value.is_empty() {
            return Err(ServiceNameError::Empty);
        }

        if value.len() > MAX_LEN {
            return Err(ServiceNameError::TooLong);
        }

        if value.starts_with('-') || value.starts_with('.') {
            return Err(ServiceNameError::BadLeadingChar);
        }

        if value.ends_with(UNIT_SUFFIX) {
            return Err(ServiceNameError::HasUnitSuffix);
        }

        for c in value.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.' | '@' | ':') {
                return Err(ServiceNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full unit name as the supervisor addresses it, e.g. `mybot.service`.
    pub fn unit_name(&self) -> String {
        format!("{}{}", self.0, UNIT_SUFFIX)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
