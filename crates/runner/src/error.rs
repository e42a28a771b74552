//! Error types for external command invocation.

use std::process::ExitStatus;
use std::time::Duration;

/// Errors produced while running an external command.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("command line is empty")]
    EmptyCommand,

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed ({status}){}", stderr_tail(.stderr))]
    Exit {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("command timed out after {}s", .0.as_secs_f64())]
    TimedOut(Duration),

    #[error("command cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Last lines of a failed command's stderr, formatted as a message suffix.
fn stderr_tail(stderr: &str) -> String {
    const MAX_LINES: usize = 20;

    let lines: Vec<&str> = stderr.trim().lines().collect();
    if lines.is_empty() {
        return String::new();
    }
    let tail = &lines[lines.len().saturating_sub(MAX_LINES)..];
    format!(":\n{}", tail.join("\n"))
}

impl RunError {
    /// Returns `true` if the command was stopped for exceeding its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, RunError::TimedOut(_))
    }
}
