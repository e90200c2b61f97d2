use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One turn of a conversation. `text` grows in place while a response
/// streams; messages are only ever removed together with their session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub from_user: bool,
}

impl Message {
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            from_user: true,
        }
    }

    /// Empty assistant placeholder, filled incrementally as deltas arrive.
    #[must_use]
    pub fn assistant_placeholder() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: String::new(),
            from_user: false,
        }
    }
}

/// One independent conversation thread. Messages are kept in strict
/// chronological append order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl ChatSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            messages: Vec::new(),
        }
    }

    /// First line of the first user message, for session lists.
    #[must_use]
    pub fn title(&self) -> &str {
        self.messages
            .iter()
            .find(|message| message.from_user)
            .map_or("(empty)", |message| {
                message.text.lines().next().unwrap_or("(empty)")
            })
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}
