//! External command invocation for the theme pipeline.
//!
//! The packaging and install tools are black boxes: they are started with
//! one extra argument, their output is captured, and exit code 0 means
//! process-level success. Every invocation is bounded by an optional
//! timeout and can be cancelled through a [`CancellationToken`].
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

mod error;
mod process;
mod spec;

pub use error::RunError;
pub use process::{CommandOutput, CommandRunner, ProcessRunner, RunFuture};
pub use spec::CommandSpec;

use std::time::Duration;

/// Default upper bound on one external command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);
