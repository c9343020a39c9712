//! Inbound event taxonomy for one logical exchange

use serde::{Deserialize, Serialize};

/// Events dispatched to subscribers for a streaming exchange.
///
/// Legal order for one exchange: zero-or-more `Token`, zero-or-one `Chart`
/// (which may arrive before or after the last token), then exactly one
/// terminal event (`Done` or `Error`). `Status` frames are informational
/// and may appear anywhere; the core ignores them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A text fragment of the in-progress assistant response
    Token { text: String },

    /// An out-of-band chart payload; the config is opaque to this layer
    Chart { config: serde_json::Value },

    /// Exchange completed successfully
    Done {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        #[serde(rename = "chartConfig", default, skip_serializing_if = "Option::is_none")]
        chart_config: Option<serde_json::Value>,
    },

    /// Exchange failed; detail is surfaced verbatim to the caller
    Error { detail: String },

    /// Informational server chatter, ignored by the core
    Status {
        #[serde(flatten)]
        info: serde_json::Value,
    },
}

impl ServerEvent {
    /// Check if this event legally ends an exchange
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServerEvent::Done { .. } | ServerEvent::Error { .. })
    }
}

/// Parse a raw text frame into a [`ServerEvent`].
///
/// Unparseable frames return `None`; the read loop logs and skips them
/// rather than tearing the connection down.
pub fn parse_frame(raw: &str) -> Option<ServerEvent> {
    match serde_json::from_str(raw) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::debug!("skipping unparseable frame: {}", e);
            None
        }
    }
}
