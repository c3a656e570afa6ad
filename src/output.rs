// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use serde::Serialize;
use std::time::Instant;

use crate::deploy::Phase;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

impl OutputMode {
    pub fn from_flags(quiet: bool, json: bool) -> Self {
        if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    fn emit(&self, event: JsonEvent<'_>, stderr: bool) {
        if let Ok(json) = serde_json::to_string(&event) {
            if stderr {
                eprintln!("{json}");
            } else {
                println!("{json}");
            }
        }
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Report entering a rollout phase.
    pub fn phase(&self, phase: Phase) {
        match self.mode {
            OutputMode::Normal => println!("  → {phase}"),
            OutputMode::Quiet => {}
            OutputMode::Json => self.emit(
                JsonEvent {
                    event: "phase",
                    message: phase.as_str(),
                    phase: Some(phase),
                    duration_secs: self.duration(),
                },
                false,
            ),
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                // Print only the essential result
                println!("{message}");
            }
            OutputMode::Json => self.emit(
                JsonEvent {
                    event: "success",
                    message,
                    phase: None,
                    duration_secs: self.duration(),
                },
                false,
            ),
        }
    }

    /// Print a non-fatal warning.
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Warning: {message}"),
            OutputMode::Json => self.emit(
                JsonEvent {
                    event: "warning",
                    message,
                    phase: None,
                    duration_secs: None,
                },
                true,
            ),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => self.emit(
                JsonEvent {
                    event: "error",
                    message,
                    phase: None,
                    duration_secs: self.duration(),
                },
                true,
            ),
        }
    }

    /// Print a failure that may have left the host without an installation.
    /// Shown in every mode, including quiet.
    pub fn critical(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                let rule = "!".repeat(72);
                eprintln!("{rule}");
                eprintln!("CRITICAL: {message}");
                eprintln!("{rule}");
            }
            OutputMode::Json => self.emit(
                JsonEvent {
                    event: "critical",
                    message,
                    phase: None,
                    duration_secs: self.duration(),
                },
                true,
            ),
        }
    }

    /// Print a structured record: JSON object in json mode, otherwise the
    /// provided human-readable lines.
    pub fn record<T: Serialize>(&self, value: &T, lines: &[String]) {
        match self.mode {
            OutputMode::Json => {
                if let Ok(json) = serde_json::to_string(value) {
                    println!("{json}");
                }
            }
            OutputMode::Normal | OutputMode::Quiet => {
                for line in lines {
                    println!("{line}");
                }
            }
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}
