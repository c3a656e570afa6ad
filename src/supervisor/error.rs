// ABOUTME: Supervisor client errors with SNAFU context selectors.
// ABOUTME: Distinguishes "could not invoke the supervisor" from "supervisor refused".

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SupervisorError {
    #[snafu(display("failed to invoke {program}: {source}"))]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[snafu(display("{program} {action} failed (exit code {code:?}): {message}"))]
    CommandFailed {
        program: String,
        action: String,
        code: Option<i32>,
        message: String,
    },
}
