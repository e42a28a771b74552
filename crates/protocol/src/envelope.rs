use serde::{Deserialize, Serialize};

use crate::constants::EventType;
use crate::messages::ThemeInstalled;
use crate::types::TaskId;

/// Body of every failed HTTP response.
///
/// The message is the textual form of the underlying failure; there are
/// no structured error codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: bool,
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
        }
    }

    /// Builds an error body from any displayable failure.
    pub fn from_error(err: &impl std::fmt::Display) -> Self {
        Self::new(err.to_string())
    }
}

/// Event published on the notification bus.
///
/// Serialized with the event type inlined under `type`, e.g.
/// `{"type":"THEME_INSTALLED","taskId":"…","success":true}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "THEME_INSTALLED")]
    ThemeInstalled(ThemeInstalled),
}

impl Event {
    pub fn event_type(&self) -> EventType {
        match self {
            Event::ThemeInstalled(_) => EventType::ThemeInstalled,
        }
    }

    /// Task that produced this event.
    pub fn task_id(&self) -> TaskId {
        match self {
            Event::ThemeInstalled(e) => e.task_id,
        }
    }
}

impl From<ThemeInstalled> for Event {
    fn from(value: ThemeInstalled) -> Self {
        Event::ThemeInstalled(value)
    }
}
