//! Chat message types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One turn in a conversation.
///
/// A message's id never changes. Order within a conversation is immutable
/// except through edit truncation; only `content` and `edited` mutate in
/// place, and only for the edited message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    /// Opaque chart payload; the core never inspects its shape. The
    /// render layer parses it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<serde_json::Value>,
    /// Milliseconds since the Unix epoch, UTC
    pub timestamp: i64,
    #[serde(default)]
    pub edited: bool,
    /// Opaque diagnostic text attached by the fallback path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_details: Option<String>,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: content.into(),
            chart: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
            edited: false,
            technical_details: None,
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            ..Self::user(content)
        }
    }

    /// Attach a chart payload
    pub fn with_chart(mut self, chart: Option<serde_json::Value>) -> Self {
        self.chart = chart;
        self
    }

    /// Attach diagnostic text
    pub fn with_technical_details(mut self, details: Option<String>) -> Self {
        self.technical_details = details;
        self
    }
}
