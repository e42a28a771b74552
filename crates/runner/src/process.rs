//! Command runner trait and the tokio process implementation.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use tokio_util::sync::CancellationToken;

use crate::{CommandSpec, RunError};

/// Captured output of a command that exited successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// A boxed future returned by [`CommandRunner::run`].
pub type RunFuture<'a> = Pin<Box<dyn Future<Output = Result<CommandOutput, RunError>> + Send + 'a>>;

/// Runs external commands.
///
/// The pipeline only talks to this trait, so tests can substitute a
/// scripted implementation for real processes.
pub trait CommandRunner: Send + Sync + 'static {
    /// Runs `spec` to completion.
    ///
    /// Resolves to the captured output on exit code 0. A non-zero exit,
    /// spawn failure, expired timeout or cancelled `cancel` token yields
    /// the matching [`RunError`].
    fn run(&self, spec: CommandSpec, cancel: CancellationToken) -> RunFuture<'_>;
}

/// Runs commands as child processes via `tokio::process`.
///
/// On unix each command runs in its own process group, and the whole group
/// is killed when the run is cancelled or times out.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, spec: CommandSpec, cancel: CancellationToken) -> RunFuture<'_> {
        Box::pin(run_process(spec, cancel))
    }
}

async fn run_process(spec: CommandSpec, cancel: CancellationToken) -> Result<CommandOutput, RunError> {
    if cancel.is_cancelled() {
        tracing::debug!(program = %spec.program, "not starting command, already cancelled");
        return Err(RunError::Cancelled);
    }

    let mut cmd = tokio::process::Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);
    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }

    tracing::debug!(command = %spec, "starting external command");
    let child = cmd.spawn().map_err(|source| RunError::Spawn {
        program: spec.program.clone(),
        source,
    })?;
    let mut group = ProcessGroup::led_by(child.id());

    // Dropping the wait future drops the child, which kills it. `group`
    // takes the rest of its process group down on every early return.
    let wait = async {
        match spec.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| RunError::TimedOut(limit))?
                .map_err(RunError::from),
            None => child.wait_with_output().await.map_err(RunError::from),
        }
    };

    let output = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::warn!(program = %spec.program, "external command cancelled");
            return Err(RunError::Cancelled);
        }
        result = wait => result,
    };

    let output = match output {
        Ok(output) => output,
        Err(e) => {
            if e.is_timeout() {
                tracing::warn!(program = %spec.program, "external command timed out");
            }
            return Err(e);
        }
    };
    group.release();

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        tracing::warn!(
            program = %spec.program,
            exit_code = ?output.status.code(),
            stderr = %stderr.trim(),
            "external command failed"
        );
        return Err(RunError::Exit {
            program: spec.program,
            status: output.status,
            stderr,
        });
    }

    Ok(CommandOutput { stdout, stderr })
}

/// Process group started for one command, killed on drop unless released.
///
/// Package-manager scripts run their real work in grandchildren, which
/// `kill_on_drop` alone would leave running.
struct ProcessGroup {
    pgid: Option<i32>,
}

impl ProcessGroup {
    fn led_by(pid: Option<u32>) -> Self {
        Self {
            pgid: pid.and_then(|pid| i32::try_from(pid).ok()),
        }
    }

    /// The leader exited on its own; leave whatever it left behind alone.
    fn release(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        #[cfg(unix)]
        {
            // SAFETY: kill(2) has no memory-safety preconditions; a negative
            // pid addresses the group created with `process_group(0)`.
            if unsafe { libc::kill(-pgid, libc::SIGKILL) } != 0 {
                tracing::debug!(pgid, "process group already gone");
            }
        }
        #[cfg(not(unix))]
        let _ = pgid;
    }
}
