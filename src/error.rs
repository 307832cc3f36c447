use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Why a registry lookup produced no record.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The lookup tool could not be started at all.
    #[error("cannot run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran but reported an error.
    #[error("`{program}` exited with {status}{}", format_stderr(.stderr))]
    ToolFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    /// The tool exited cleanly without printing anything.
    #[error("empty response received, check that the hostname is correct")]
    EmptyResponse,

    /// The tool did not finish within the configured timeout and was killed.
    #[error("`{program}` did not answer within {}s", .timeout.as_secs_f32())]
    TimedOut { program: String, timeout: Duration },

    /// Talking to the child process failed after it started.
    #[error("I/O error while waiting for `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

fn format_stderr(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}
