//! One-shot non-streaming fallback
//!
//! When [`StreamTransport::send`](crate::StreamTransport::send) fails with
//! `NotConnected`, the caller retries the same request as a single
//! request/response HTTP call: no tokens, the whole assistant message and
//! any chart arrive in one body.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::request::ChatRequest;

/// Response body of the fallback endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub success: bool,
    pub conversation_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_config: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// HTTP client for the non-streaming chat endpoint
pub struct FallbackClient {
    client: reqwest::Client,
    endpoint: String,
}

impl FallbackClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Run one full exchange in a single round trip.
    ///
    /// The request is sent with the streaming flag cleared. A body with
    /// `success == false` surfaces as [`Error::Remote`] carrying the
    /// server's error detail verbatim.
    pub async fn complete(&self, request: ChatRequest) -> Result<ChatResponse> {
        let request = request.into_fallback();
        let response: ChatResponse = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.success {
            let detail = response
                .error
                .unwrap_or_else(|| "request failed without detail".to_string());
            return Err(Error::Remote(detail));
        }
        Ok(response)
    }
}
