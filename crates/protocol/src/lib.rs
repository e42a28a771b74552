//! Wire types for the storefront theme service.
//!
//! Everything that crosses a process boundary lives here: HTTP bodies,
//! notification-bus events, task identifiers and archive names.

pub mod constants;
pub mod envelope;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use constants::{ARCHIVE_SUFFIX, EventType, TASK_ID_HEADER};
pub use envelope::{ErrorBody, Event};
pub use messages::{ExportResponse, ThemeInstalled};
pub use types::{ArchiveName, InvalidArchiveName, TaskId};
