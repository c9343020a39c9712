//! The persistent duplex connection
//!
//! One physical WebSocket multiplexes requests for potentially many
//! conversations on one dataset session. The connection is created lazily
//! on first need and torn down on explicit close or unrecoverable error.
//! There is no automatic reconnect and no backoff: a failed connect leaves
//! the transport disconnected and reconnection is caller-initiated. That
//! trade-off is deliberate; see DESIGN.md.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message as WsMessage,
};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::events::{ServerEvent, parse_frame};
use crate::filter::ExchangeFilter;
use crate::request::ChatRequest;

/// Connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    fn name(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        }
    }
}

type WsSink = futures::stream::SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;

/// The streaming transport: one connection shared across all conversations
/// of the active dataset session.
pub struct StreamTransport {
    url: String,
    state: Arc<Mutex<ConnectionState>>,
    writer: Option<WsSink>,
    event_tx: broadcast::Sender<ServerEvent>,
    filter: Arc<Mutex<ExchangeFilter>>,
    reader: Option<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl StreamTransport {
    /// Create a transport for the given WebSocket URL. No connection is
    /// opened until [`connect`](Self::connect) is called.
    pub fn new(url: impl Into<String>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            url: url.into(),
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            writer: None,
            event_tx,
            filter: Arc::new(Mutex::new(ExchangeFilter::new())),
            reader: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Subscribe to inbound events. Subscribers see only frames that
    /// passed the exchange filter.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.event_tx.subscribe()
    }

    /// Open the connection: `disconnected -> connecting -> connected`.
    ///
    /// On failure the transport re-enters `disconnected` and schedules no
    /// retry; the caller decides whether and when to reconnect.
    pub async fn connect(&mut self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != ConnectionState::Disconnected {
                return Err(Error::AlreadyConnected(state.name()));
            }
            *state = ConnectionState::Connecting;
        }

        let socket = match connect_async(&self.url).await {
            Ok((socket, _response)) => socket,
            Err(e) => {
                *self.state.lock() = ConnectionState::Disconnected;
                return Err(Error::Socket(e));
            }
        };

        let (writer, reader) = socket.split();
        self.writer = Some(writer);
        self.shutdown = CancellationToken::new();
        self.reader = Some(spawn_read_loop(
            reader,
            self.event_tx.clone(),
            Arc::clone(&self.filter),
            Arc::clone(&self.state),
            self.shutdown.clone(),
        ));
        *self.state.lock() = ConnectionState::Connected;
        tracing::debug!(url = %self.url, "transport connected");
        Ok(())
    }

    /// Send a chat request over the connection.
    ///
    /// Requires the `connected` state, otherwise fails with
    /// [`Error::NotConnected`] and the caller falls back to the one-shot
    /// path. A streaming request opens a new exchange in the filter.
    pub async fn send(&mut self, request: &ChatRequest) -> Result<()> {
        if self.state() != ConnectionState::Connected {
            return Err(Error::NotConnected);
        }
        let writer = self.writer.as_mut().ok_or(Error::NotConnected)?;

        let frame = serde_json::to_string(request)?;
        if request.streaming {
            self.filter.lock().open();
        }
        if let Err(e) = writer.send(WsMessage::Text(frame)).await {
            *self.state.lock() = ConnectionState::Disconnected;
            self.filter.lock().close();
            return Err(Error::Socket(e));
        }
        Ok(())
    }

    /// Cancel the current exchange. Purely client-local: nothing is sent
    /// to the peer, whose in-flight work continues; its remaining frames
    /// are dropped by the filter.
    pub fn cancel(&self) {
        self.filter.lock().close();
    }

    /// Tear the connection down and return to `disconnected`.
    pub async fn close(&mut self) {
        self.shutdown.cancel();
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.close().await;
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.await;
        }
        self.filter.lock().close();
        *self.state.lock() = ConnectionState::Disconnected;
    }
}

fn spawn_read_loop(
    mut reader: futures::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>,
    event_tx: broadcast::Sender<ServerEvent>,
    filter: Arc<Mutex<ExchangeFilter>>,
    state: Arc<Mutex<ConnectionState>>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                frame = reader.next() => match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        if let Some(event) = parse_frame(&text) {
                            if let Some(event) = filter.lock().admit(event) {
                                // Send fails only with zero subscribers
                                let _ = event_tx.send(event);
                            }
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        tracing::debug!("peer closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!("read loop terminating: {}", e);
                        break;
                    }
                },
            }
        }
        filter.lock().close();
        *state.lock() = ConnectionState::Disconnected;
    })
}
