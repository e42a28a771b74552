//! How a finished packaging run proves it actually wrote the archive.
//!
//! The packaging tool can exit 0 without producing anything, so exit code
//! alone is not enough. The stdout marker is a free-text heuristic kept
//! for tools that cannot be changed; `OutputFile` is the stricter
//! contract for tools that can.

use std::path::Path;

use shopfront_runner::CommandOutput;

/// Completion signal required from the packaging command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportCheck {
    /// Stdout must contain the marker text.
    StdoutMarker(String),
    /// The archive file must exist once the command exits.
    OutputFile,
}

impl Default for ExportCheck {
    fn default() -> Self {
        ExportCheck::StdoutMarker(crate::DEFAULT_SUCCESS_MARKER.to_string())
    }
}

impl ExportCheck {
    /// Returns `true` if `output` and the filesystem confirm `archive`
    /// was produced.
    pub async fn confirms(&self, output: &CommandOutput, archive: &Path) -> bool {
        match self {
            ExportCheck::StdoutMarker(marker) => stdout_has_marker(&output.stdout, marker),
            ExportCheck::OutputFile => tokio::fs::metadata(archive)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
        }
    }
}

/// Plain substring match, anywhere in the output.
fn stdout_has_marker(stdout: &str, marker: &str) -> bool {
    !marker.is_empty() && stdout.contains(marker)
}
