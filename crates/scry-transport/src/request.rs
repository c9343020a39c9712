//! Outbound request shape shared by the streaming and fallback paths

use serde::{Deserialize, Serialize};

/// One chat request: the user's message plus routing fields.
///
/// `conversation_id` is `None` for the first turn of a brand-new
/// conversation; the backend assigns one and echoes it in the terminal
/// event (streaming) or the response body (fallback).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub dataset_id: String,
    pub conversation_id: Option<String>,
    pub streaming: bool,
}

impl ChatRequest {
    /// Build a streaming request for an existing conversation
    pub fn streaming(
        message: impl Into<String>,
        dataset_id: impl Into<String>,
        conversation_id: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            dataset_id: dataset_id.into(),
            conversation_id: Some(conversation_id.into()),
            streaming: true,
        }
    }

    /// Downgrade to the one-shot fallback shape
    pub fn into_fallback(mut self) -> Self {
        self.streaming = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_camel_case() {
        let req = ChatRequest::streaming("revenue trend?", "ds-42", "c1");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["message"], "revenue trend?");
        assert_eq!(json["datasetId"], "ds-42");
        assert_eq!(json["conversationId"], "c1");
        assert_eq!(json["streaming"], true);
    }

    #[test]
    fn test_request_null_conversation_for_new_chat() {
        let req = ChatRequest {
            message: "hello".into(),
            dataset_id: "ds-1".into(),
            conversation_id: None,
            streaming: true,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json["conversationId"].is_null());
    }

    #[test]
    fn test_into_fallback_clears_streaming_flag() {
        let req = ChatRequest::streaming("q", "ds", "c").into_fallback();
        assert!(!req.streaming);
    }
}
