//! WebSocket handshake validation per RFC 6455 section 4.2.
//!
//! These functions take the request method and headers directly so the
//! server can inspect a request wherever it sits in the pipeline. The
//! actual protocol switch happens on the raw connection via
//! [`complete_upgrade`] once hyper releases it.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Method, Response, StatusCode};
use http_body_util::Full;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;

use crate::error::{WsError, WsResult};

/// Magic GUID appended to the client key when computing the accept digest.
pub const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The only WebSocket protocol version the server speaks.
pub const WEBSOCKET_VERSION: &str = "13";

/// Returns `true` if the request asks to switch to the WebSocket protocol.
///
/// This is a cheap routing check, not a full validation. Use
/// [`validate_upgrade`] to verify the handshake before responding.
#[must_use]
pub fn is_upgrade_request(method: &Method, headers: &HeaderMap) -> bool {
    method == Method::GET
        && header_contains_token(headers, header::CONNECTION, "upgrade")
        && header_equals(headers, header::UPGRADE, "websocket")
}

/// Validates the client handshake and returns the computed accept key.
///
/// Checks the method, `Connection` and `Upgrade` headers, the protocol
/// version and the client nonce. On success the returned string is the
/// value to send back in `Sec-WebSocket-Accept`.
pub fn validate_upgrade(method: &Method, headers: &HeaderMap) -> WsResult<String> {
    if method != Method::GET {
        return Err(WsError::not_websocket(format!(
            "method must be GET, got {method}"
        )));
    }
    if !header_contains_token(headers, header::CONNECTION, "upgrade") {
        return Err(WsError::not_websocket(
            "connection header missing upgrade token",
        ));
    }
    if !header_equals(headers, header::UPGRADE, "websocket") {
        return Err(WsError::not_websocket("upgrade header is not websocket"));
    }
    match headers.get(header::SEC_WEBSOCKET_VERSION) {
        Some(version) if version.as_bytes() == WEBSOCKET_VERSION.as_bytes() => {}
        Some(version) => {
            return Err(WsError::not_websocket(format!(
                "unsupported websocket version {}",
                String::from_utf8_lossy(version.as_bytes())
            )));
        }
        None => {
            return Err(WsError::not_websocket(
                "missing sec-websocket-version header",
            ));
        }
    }
    let key = headers
        .get(header::SEC_WEBSOCKET_KEY)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| WsError::not_websocket("missing sec-websocket-key header"))?;
    let decoded = BASE64
        .decode(key.trim())
        .map_err(|_| WsError::not_websocket("sec-websocket-key is not valid base64"))?;
    if decoded.len() != 16 {
        return Err(WsError::not_websocket(
            "sec-websocket-key must decode to 16 bytes",
        ));
    }
    Ok(compute_accept_key(key.trim()))
}

/// Computes the `Sec-WebSocket-Accept` digest for a client key.
#[must_use]
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Lists the subprotocols the client offered, in preference order.
#[must_use]
pub fn requested_protocols(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|proto| !proto.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Builds the `101 Switching Protocols` response for an accepted handshake.
///
/// `protocol` is the subprotocol the server selected, if any. It must be
/// one of the values the client offered.
pub fn upgrade_response(
    accept_key: &str,
    protocol: Option<&str>,
) -> WsResult<Response<Full<Bytes>>> {
    let accept = HeaderValue::from_str(accept_key)
        .map_err(|err| WsError::handshake(format!("invalid accept key: {err}")))?;
    let mut builder = Response::builder()
        .status(StatusCode::SWITCHING_PROTOCOLS)
        .header(header::CONNECTION, "Upgrade")
        .header(header::UPGRADE, "websocket")
        .header(header::SEC_WEBSOCKET_ACCEPT, accept);
    if let Some(proto) = protocol {
        let value = HeaderValue::from_str(proto)
            .map_err(|err| WsError::handshake(format!("invalid subprotocol: {err}")))?;
        builder = builder.header(header::SEC_WEBSOCKET_PROTOCOL, value);
    }
    builder
        .body(Full::default())
        .map_err(|err| WsError::handshake(err.to_string()))
}

/// Wraps an already-upgraded connection in a server-role WebSocket stream.
///
/// The handshake response must have been sent before calling this, the
/// stream starts directly in frame mode.
pub async fn complete_upgrade<S>(stream: S) -> WebSocketStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    WebSocketStream::from_raw_socket(stream, tungstenite::protocol::Role::Server, None).await
}

/// Checks a comma separated header for a token, case insensitive.
fn header_contains_token(headers: &HeaderMap, name: header::HeaderName, token: &str) -> bool {
    headers
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|candidate| candidate.trim().eq_ignore_ascii_case(token))
}

/// Checks a header for an exact value, case insensitive.
fn header_equals(headers: &HeaderMap, name: header::HeaderName, expected: &str) -> bool {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim().eq_ignore_ascii_case(expected))
}
