//! Theme packaging and installation pipeline.
//!
//! Two independent flows share [`ThemeService`]:
//!
//! - **export**: run the external packaging command and hand back the
//!   generated archive once the command confirms it produced it.
//! - **install**: stream a multipart upload to disk with
//!   [`UploadReceiver`], acknowledge immediately, and run the external
//!   install command in the background. Its outcome is published as a
//!   `THEME_INSTALLED` event on the notification bus.

mod archive;
mod check;
mod error;
mod service;
mod upload;

pub use archive::ArchiveRef;
pub use check::ExportCheck;
pub use error::{ThemeError, UploadError};
pub use service::{InstallTicket, ThemeService, ThemeSettings};
pub use upload::{StoredUpload, UploadReceiver};

/// Stdout marker the packaging tool prints when the archive was written.
pub const DEFAULT_SUCCESS_MARKER: &str = "success";

/// Default packaging command line; the archive name is appended.
pub const DEFAULT_EXPORT_COMMAND: &[&str] = &["npm", "--silent", "run", "theme:export", "--"];

/// Default install command line; the uploaded archive name is appended.
pub const DEFAULT_INSTALL_COMMAND: &[&str] = &["npm", "run", "theme:install"];
