// ABOUTME: Library root for handover - exposes the rollout machinery for the binary and tests.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod process;
pub mod provision;
pub mod register;
pub mod release;
pub mod supervisor;
pub mod swap;
pub mod types;
