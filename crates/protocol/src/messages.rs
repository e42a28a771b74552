use serde::{Deserialize, Serialize};

use crate::types::{ArchiveName, TaskId};

/// Successful export response: the public path of the generated archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportResponse {
    pub file: String,
}

impl ExportResponse {
    pub fn for_archive(name: &ArchiveName) -> Self {
        Self {
            file: name.url_path(),
        }
    }
}

/// Outcome of one install command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeInstalled {
    pub task_id: TaskId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ThemeInstalled {
    pub fn succeeded(task_id: TaskId) -> Self {
        Self {
            task_id,
            success: true,
            message: None,
        }
    }

    pub fn failed(task_id: TaskId, message: impl Into<String>) -> Self {
        Self {
            task_id,
            success: false,
            message: Some(message.into()),
        }
    }
}
