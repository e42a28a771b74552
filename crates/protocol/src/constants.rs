use serde::{Deserialize, Serialize};

/// File name suffix every theme archive must carry.
pub const ARCHIVE_SUFFIX: &str = ".zip";

/// Response header carrying the task id of an accepted install.
pub const TASK_ID_HEADER: &str = "x-task-id";

/// Notification-bus event type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "THEME_INSTALLED")]
    ThemeInstalled,
}

impl EventType {
    /// Returns the wire name of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ThemeInstalled => "THEME_INSTALLED",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_wire_name_matches_serde() {
        let json = serde_json::to_string(&EventType::ThemeInstalled).unwrap();
        assert_eq!(json, format!("\"{}\"", EventType::ThemeInstalled.as_str()));
    }
}
