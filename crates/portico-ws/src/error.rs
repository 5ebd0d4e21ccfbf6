//! Error types for WebSocket handshakes and connections.

use thiserror::Error;

/// Convenience alias for WebSocket results.
pub type WsResult<T> = Result<T, WsError>;

/// Errors raised while upgrading or speaking the WebSocket protocol.
#[derive(Debug, Error)]
pub enum WsError {
    /// The HTTP request does not qualify as a WebSocket upgrade.
    #[error("not a websocket upgrade request: {reason}")]
    NotWebSocketRequest {
        /// Which part of the handshake was missing or malformed.
        reason: String,
    },

    /// The upgrade was accepted but completing it failed.
    #[error("websocket handshake failed: {0}")]
    HandshakeFailed(String),

    /// The peer closed the connection.
    #[error("connection closed: code {code}, reason: {reason}")]
    ConnectionClosed {
        /// Close code sent by the peer, `1005` if none was supplied.
        code: u16,
        /// Close reason, may be empty.
        reason: String,
    },

    /// Writing a frame to the peer failed.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// Reading a frame from the peer failed.
    #[error("failed to receive message: {0}")]
    ReceiveFailed(String),

    /// The peer violated the WebSocket protocol.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Underlying transport error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the WebSocket protocol implementation.
    #[error("websocket protocol error: {0}")]
    Tungstenite(#[from] tungstenite::Error),
}

impl WsError {
    /// Creates a [`WsError::NotWebSocketRequest`] error.
    pub fn not_websocket(reason: impl Into<String>) -> Self {
        Self::NotWebSocketRequest {
            reason: reason.into(),
        }
    }

    /// Creates a [`WsError::HandshakeFailed`] error.
    pub fn handshake(message: impl Into<String>) -> Self {
        Self::HandshakeFailed(message.into())
    }

    /// Creates a [`WsError::ConnectionClosed`] error.
    pub fn closed(code: u16, reason: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            code,
            reason: reason.into(),
        }
    }

    /// Creates a [`WsError::SendFailed`] error.
    pub fn send(message: impl Into<String>) -> Self {
        Self::SendFailed(message.into())
    }

    /// Creates a [`WsError::ReceiveFailed`] error.
    pub fn receive(message: impl Into<String>) -> Self {
        Self::ReceiveFailed(message.into())
    }

    /// Creates a [`WsError::Protocol`] error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Returns `true` if the error means the connection is gone.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::ConnectionClosed { .. })
    }
}

/// Standard WebSocket close codes from RFC 6455 section 7.4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    /// Normal closure, the purpose of the connection was fulfilled.
    Normal = 1000,
    /// The endpoint is going away, e.g. server shutdown.
    GoingAway = 1001,
    /// A protocol error was detected.
    ProtocolError = 1002,
    /// A data type the endpoint cannot accept was received.
    UnsupportedData = 1003,
    /// A message contained data inconsistent with its type.
    InvalidPayload = 1007,
    /// A message violated the endpoint's policy.
    PolicyViolation = 1008,
    /// A message was too big to process.
    MessageTooBig = 1009,
    /// The client expected an extension the server did not negotiate.
    MandatoryExtension = 1010,
    /// The server encountered an unexpected condition.
    InternalError = 1011,
    /// The server is restarting.
    ServiceRestart = 1012,
    /// The server is overloaded, the client should retry later.
    TryAgainLater = 1013,
}

impl CloseCode {
    /// Maps a wire close code to a known variant.
    #[must_use]
    pub const fn from_u16(code: u16) -> Option<Self> {
        match code {
            1000 => Some(Self::Normal),
            1001 => Some(Self::GoingAway),
            1002 => Some(Self::ProtocolError),
            1003 => Some(Self::UnsupportedData),
            1007 => Some(Self::InvalidPayload),
            1008 => Some(Self::PolicyViolation),
            1009 => Some(Self::MessageTooBig),
            1010 => Some(Self::MandatoryExtension),
            1011 => Some(Self::InternalError),
            1012 => Some(Self::ServiceRestart),
            1013 => Some(Self::TryAgainLater),
            _ => None,
        }
    }

    /// Returns the numeric wire value of the code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Normal => "normal closure",
            Self::GoingAway => "going away",
            Self::ProtocolError => "protocol error",
            Self::UnsupportedData => "unsupported data",
            Self::InvalidPayload => "invalid payload",
            Self::PolicyViolation => "policy violation",
            Self::MessageTooBig => "message too big",
            Self::MandatoryExtension => "mandatory extension",
            Self::InternalError => "internal error",
            Self::ServiceRestart => "service restart",
            Self::TryAgainLater => "try again later",
        };
        write!(f, "{} ({})", self.as_u16(), name)
    }
}
