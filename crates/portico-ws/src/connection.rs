//! Server-side WebSocket connection wrapper.
//!
//! [`WebSocket`] owns the two halves of a [`WebSocketStream`] and layers
//! the small amount of protocol bookkeeping every handler needs: ping
//! frames are answered automatically, close frames latch the connection
//! as closed, and send errors are reported through [`WsError`].

use std::fmt;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tungstenite::protocol::frame::CloseFrame;
use tungstenite::Message;
use uuid::Uuid;

use crate::error::{CloseCode, WsError, WsResult};
use crate::upgrade::complete_upgrade;

/// Identifier assigned to every accepted connection.
///
/// Uses UUID v7 so identifiers sort by accept time in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generates a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for ConnectionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// An accepted server-side WebSocket connection.
pub struct WebSocket<S> {
    id: ConnectionId,
    sender: SplitSink<WebSocketStream<S>, Message>,
    receiver: SplitStream<WebSocketStream<S>>,
    closed: bool,
}

impl<S> WebSocket<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already established WebSocket stream.
    #[must_use]
    pub fn new(stream: WebSocketStream<S>) -> Self {
        let (sender, receiver) = stream.split();
        Self {
            id: ConnectionId::new(),
            sender,
            receiver,
            closed: false,
        }
    }

    /// Puts an upgraded connection into frame mode and wraps it.
    ///
    /// The `101 Switching Protocols` response must already be on the wire.
    pub async fn from_upgraded(io: S) -> Self {
        Self::new(complete_upgrade(io).await)
    }

    /// Returns the identifier assigned to this connection.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns `true` once the connection has closed in either direction.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Sends a message to the peer.
    pub async fn send(&mut self, message: Message) -> WsResult<()> {
        if self.closed {
            return Err(WsError::send("connection already closed"));
        }
        self.sender
            .send(message)
            .await
            .map_err(|err| WsError::send(err.to_string()))
    }

    /// Sends a text frame to the peer.
    pub async fn send_text(&mut self, text: impl Into<String>) -> WsResult<()> {
        self.send(Message::Text(text.into().into())).await
    }

    /// Receives the next message from the peer.
    ///
    /// Ping frames are answered with a pong and skipped, pong frames are
    /// skipped. A close frame is returned to the caller and marks the
    /// connection closed. Returns `None` once the stream is exhausted.
    pub async fn recv(&mut self) -> Option<WsResult<Message>> {
        loop {
            match self.receiver.next().await {
                Some(Ok(Message::Ping(payload))) => {
                    if let Err(err) = self.sender.send(Message::Pong(payload)).await {
                        self.closed = true;
                        return Some(Err(WsError::send(err.to_string())));
                    }
                }
                Some(Ok(Message::Pong(_))) => {}
                Some(Ok(message @ Message::Close(_))) => {
                    self.closed = true;
                    return Some(Ok(message));
                }
                Some(Ok(message)) => return Some(Ok(message)),
                Some(Err(err)) => {
                    self.closed = true;
                    return Some(Err(err.into()));
                }
                None => {
                    self.closed = true;
                    return None;
                }
            }
        }
    }

    /// Performs the closing handshake with the given code and reason.
    ///
    /// Calling close on an already closed connection is a no-op.
    pub async fn close(&mut self, code: CloseCode, reason: &str) -> WsResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let frame = CloseFrame {
            code: code.as_u16().into(),
            reason: reason.into(),
        };
        self.sender
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|err| WsError::send(err.to_string()))
    }
}

impl<S> fmt::Debug for WebSocket<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocket")
            .field("id", &self.id)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
