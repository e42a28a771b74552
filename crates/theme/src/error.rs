//! Error types for the theme pipeline.

use std::path::PathBuf;

use shopfront_runner::RunError;

/// Errors that end an upload session.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("request is not multipart/form-data: {0}")]
    NotMultipart(String),

    #[error("cannot prepare upload directory {}: {source}", .path.display())]
    UploadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed upload: {0}")]
    Multipart(#[from] multer::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cant upload file: no .zip file found in upload")]
    NoArchive,
}

/// Errors reported to the caller of an export or install request.
#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    #[error(transparent)]
    Command(#[from] RunError),

    /// The packaging command exited cleanly but did not confirm that it
    /// produced the archive.
    #[error("Something went wrong in scripts")]
    ExportIncomplete,

    #[error(transparent)]
    Upload(#[from] UploadError),
}
