// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles service names and single-component directory names.

use serde::Deserialize;
use std::path::{Component, Path};

use crate::types::ServiceName;

pub fn deserialize_service_name<'de, D>(deserializer: D) -> Result<ServiceName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ServiceName::new(&s).map_err(serde::de::Error::custom)
}

/// A name that is exactly one normal path component (no `/`, `..`, or `.`).
pub fn deserialize_plain_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let mut components = Path::new(&s).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(s),
        _ => Err(serde::de::Error::custom(format!(
            "'{s}' must be a plain directory name"
        ))),
    }
}
