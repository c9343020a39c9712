//! scry-core: conversation state machine for the scry analytics client
//!
//! This crate owns all chat state for a dataset session: conversations and
//! their messages, the single in-flight streaming buffer, edit-and-rerun of
//! past user turns, the pump that applies transport events to the store,
//! and session persistence. Rendering is an external collaborator that
//! reads the store's snapshot getters and never mutates state directly.

pub mod conversation;
pub mod edit;
pub mod error;
pub mod message;
pub mod pump;
pub mod session;
pub mod store;

pub use conversation::{Conversation, StreamSession};
pub use edit::EditOutcome;
pub use error::{Error, Result};
pub use message::{Message, Role};
pub use pump::{run_exchange, run_exchange_from_receiver};
pub use session::SessionManager;
pub use store::ConversationStore;
