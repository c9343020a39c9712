//! Conversation state and the streaming buffer

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::Message;

/// One conversation on one dataset. Owned exclusively by the store;
/// destroyed only by explicit deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub dataset_id: String,
    /// Derived from the dataset; the sidebar shows this
    pub display_name: String,
    /// Insertion order is chronological order
    pub messages: Vec<Message>,
    pub created_at: i64,
}

impl Conversation {
    pub fn new(dataset_id: impl Into<String>) -> Self {
        let dataset_id = dataset_id.into();
        Self {
            id: Uuid::new_v4(),
            display_name: format!("Chat on {}", dataset_id),
            dataset_id,
            messages: Vec::new(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// The streaming buffer: scratch state for the one in-flight assistant
/// message. Its target message exists only here until finalized; it is
/// never persisted.
#[derive(Debug)]
pub struct StreamSession {
    pub conversation_id: Uuid,
    /// Id the finalized assistant message will carry
    pub message_id: Uuid,
    /// Accumulated text, concatenated in token arrival order
    pub text: String,
    /// Chart staged by an out-of-band `chart` event, if one arrived
    pub chart: Option<serde_json::Value>,
}

impl StreamSession {
    pub fn new(conversation_id: Uuid, message_id: Uuid) -> Self {
        Self {
            conversation_id,
            message_id,
            text: String::new(),
            chart: None,
        }
    }
}
