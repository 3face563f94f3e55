//! Persisted chat-history rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One turn of conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    /// Base64-encoded images attached to the turn.
    #[serde(default)]
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            images: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_images(role: MessageRole, content: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            images,
            ..Self::new(role, content)
        }
    }
}
