//! scry-transport: wire layer for the scry chat core
//!
//! This crate owns the persistent duplex connection to the analytics
//! backend: connect/close lifecycle, frame codec, inbound event dispatch,
//! per-exchange filtering, client-local cancellation, and the one-shot
//! non-streaming fallback call.

pub mod connection;
pub mod error;
pub mod events;
pub mod fallback;
pub mod filter;
pub mod request;

pub use connection::{ConnectionState, StreamTransport};
pub use error::{Error, Result};
pub use events::ServerEvent;
pub use fallback::{ChatResponse, FallbackClient};
pub use filter::ExchangeFilter;
pub use request::ChatRequest;
