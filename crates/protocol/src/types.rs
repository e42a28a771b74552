use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::ARCHIVE_SUFFIX;

/// Identifier of one export or install task.
///
/// Generated when the task is created and carried by every event the
/// task publishes, so observers can correlate outcomes with requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a fresh random task id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Reasons a file name is not accepted as a theme archive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidArchiveName {
    #[error("archive name is empty")]
    Empty,

    #[error("archive name must end with .zip: {0}")]
    Suffix(String),

    #[error("archive name must be a plain file name: {0}")]
    NotPlain(String),
}

/// A plain file name carrying the archive suffix.
///
/// Never contains a path separator, so joining it onto a directory
/// always yields a direct child of that directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArchiveName(String);

impl ArchiveName {
    /// Validates `name` as an archive file name.
    pub fn parse(name: impl Into<String>) -> Result<Self, InvalidArchiveName> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvalidArchiveName::Empty);
        }
        if name.contains(['/', '\\', '\0']) || name == "." || name == ".." {
            return Err(InvalidArchiveName::NotPlain(name));
        }
        if !name.ends_with(ARCHIVE_SUFFIX) {
            return Err(InvalidArchiveName::Suffix(name));
        }
        Ok(Self(name))
    }

    /// Archive name generated for an export task: `<task-id>.zip`.
    pub fn for_task(task_id: TaskId) -> Self {
        Self(format!("{task_id}{ARCHIVE_SUFFIX}"))
    }

    /// Public URL path under which the archive is served (`/<name>`).
    pub fn url_path(&self) -> String {
        format!("/{}", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArchiveName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ArchiveName {
    type Error = InvalidArchiveName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ArchiveName> for String {
    fn from(value: ArchiveName) -> Self {
        value.0
    }
}
