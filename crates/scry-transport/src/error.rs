//! Error types for scry-transport

use thiserror::Error;

/// Result type alias using scry-transport Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur on the wire layer
#[derive(Error, Debug)]
pub enum Error {
    /// Send attempted while the connection is not in the connected state
    #[error("transport is not connected")]
    NotConnected,

    /// Connect attempted while a connection is already up or in progress
    #[error("transport is already {0}")]
    AlreadyConnected(&'static str),

    /// WebSocket-level failure (handshake or established connection)
    #[error("websocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    /// HTTP request failed (fallback path)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote peer reported a failure in-band
    #[error("remote error: {0}")]
    Remote(String),
}
