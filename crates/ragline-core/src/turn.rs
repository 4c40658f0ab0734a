//! Conversation turns — the unit of persisted chat history.
//!
//! A turn is never mutated after creation; a session's history only grows
//! (append) or is erased wholesale (clear).

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    Human,
    Assistant,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnRole::Human => write!(f, "human"),
            TurnRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in a conversation, persisted in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    /// Epoch milliseconds. Informational; ordering is positional.
    #[serde(default)]
    pub created_at: i64,
}

impl Turn {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Human,
            content: content.into(),
            created_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
            created_at: Utc::now().timestamp_millis(),
        }
    }
}
