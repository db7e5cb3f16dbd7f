use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which side of the conversation produced a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

/// One conversational turn in the message log.
///
/// Messages are immutable once created: the log they live in is append-only
/// and only a full clear removes them. Legal-citation substrings inside
/// `text` are recognized for display highlighting only, never parsed
/// structurally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier, generated at creation and never reused.
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    /// Creation time. Immutable.
    pub timestamp: DateTime<Utc>,
    /// Marks a synthetic failure-fallback message.
    pub is_error: bool,
    /// Marks a degraded/non-primary response.
    pub is_fallback: bool,
}

impl Message {
    /// Create a user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::User,
            text: text.into(),
            timestamp: Utc::now(),
            is_error: false,
            is_fallback: false,
        }
    }

    /// Create an assistant turn from a backend reply.
    pub fn assistant(text: impl Into<String>, is_fallback: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
            is_error: false,
            is_fallback,
        }
    }

    /// Create the locally synthesized assistant turn used when the backend
    /// is unreachable or errors.
    pub fn fallback(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
            is_error: true,
            is_fallback: true,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
