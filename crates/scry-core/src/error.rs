//! Error types for scry-core

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using scry-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during store and edit operations
#[derive(Error, Debug)]
pub enum Error {
    /// Operation referenced a conversation id the store does not know
    #[error("unknown conversation: {0}")]
    UnknownConversation(Uuid),

    /// A stream is already active when another begin/mutate was attempted
    #[error("a stream is already active")]
    ConflictingStream,

    /// Edit target is absent from the conversation
    #[error("message not found: {0}")]
    NotFound(Uuid),

    /// Edit target is an assistant message; only user turns are editable
    #[error("only user messages can be edited")]
    InvalidRole,

    /// The exchange ended with the server's error detail, verbatim
    #[error("stream failed: {0}")]
    StreamFailed(String),

    /// An error from the wire layer
    #[error(transparent)]
    Transport(#[from] scry_transport::Error),
}
