//! WebSocket support for Portico servers.
//!
//! This crate covers the two halves of serving WebSockets over hyper:
//! validating the HTTP handshake while the request is still an ordinary
//! request, and wrapping the raw connection once hyper hands it over.
//!
//! # Handshake
//!
//! ```
//! use http::{header, HeaderMap, HeaderValue, Method};
//! use portico_ws::{is_upgrade_request, validate_upgrade};
//!
//! let mut headers = HeaderMap::new();
//! headers.insert(header::CONNECTION, HeaderValue::from_static("Upgrade"));
//! headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
//! headers.insert(header::SEC_WEBSOCKET_VERSION, HeaderValue::from_static("13"));
//! headers.insert(
//!     header::SEC_WEBSOCKET_KEY,
//!     HeaderValue::from_static("dGhlIHNhbXBsZSBub25jZQ=="),
//! );
//!
//! assert!(is_upgrade_request(&Method::GET, &headers));
//! let accept_key = validate_upgrade(&Method::GET, &headers)?;
//! assert_eq!(accept_key, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
//! # Ok::<(), portico_ws::WsError>(())
//! ```
//!
//! The accept key goes into the `101 Switching Protocols` response built
//! by [`upgrade_response`]. After hyper completes the upgrade, wrap the
//! connection with [`WebSocket::from_upgraded`] and exchange [`Message`]
//! frames.

mod connection;
mod error;
mod upgrade;

pub use connection::{ConnectionId, WebSocket};
pub use error::{CloseCode, WsError, WsResult};
pub use upgrade::{
    complete_upgrade, compute_accept_key, is_upgrade_request, requested_protocols,
    upgrade_response, validate_upgrade, WEBSOCKET_GUID, WEBSOCKET_VERSION,
};

pub use tungstenite::Message;
