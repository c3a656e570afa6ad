// ABOUTME: Validated domain types shared across the crate.
// ABOUTME: Service names and backup directory names.

mod backup_name;
mod service_name;

pub use backup_name::{BackupName, ParseBackupNameError};
pub use service_name::{ServiceName, ServiceNameError};
