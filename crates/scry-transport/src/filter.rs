//! Per-exchange gating of inbound events
//!
//! The read loop runs this filter over every parsed frame before handing
//! it to subscribers. Frames outside an open exchange are dropped: stray
//! tokens after a terminal event (late network delivery), or anything
//! arriving after a local cancel. Dropping is logged at debug and is never
//! an error.

use crate::events::ServerEvent;

/// Gate that admits events only while an exchange is open.
///
/// One exchange at a time: [`open`](Self::open) on send, closed either by
/// the terminal event passing through or by [`close`](Self::close) on a
/// local cancel. Cancellation is client-local only; the peer keeps
/// computing and its frames keep arriving, which is exactly what this
/// filter absorbs.
#[derive(Debug, Default)]
pub struct ExchangeFilter {
    active: bool,
}

impl ExchangeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new exchange. Called when a streaming request is sent.
    pub fn open(&mut self) {
        self.active = true;
    }

    /// Close the current exchange without a terminal event (local cancel).
    pub fn close(&mut self) {
        self.active = false;
    }

    /// Whether an exchange is currently open.
    pub fn is_open(&self) -> bool {
        self.active
    }

    /// Admit or drop one event.
    ///
    /// A terminal event is admitted and closes the exchange; everything
    /// after it is dropped until the next [`open`](Self::open). `Status`
    /// frames never open or close anything and always pass through.
    pub fn admit(&mut self, event: ServerEvent) -> Option<ServerEvent> {
        if matches!(event, ServerEvent::Status { .. }) {
            return Some(event);
        }
        if !self.active {
            tracing::debug!("dropping frame outside an open exchange: {:?}", event);
            return None;
        }
        if event.is_terminal() {
            self.active = false;
        }
        Some(event)
    }
}
