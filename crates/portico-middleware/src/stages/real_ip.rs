//! Client IP resolution middleware.
//!
//! Resolves the originating client address from proxy headers, falling
//! back to the socket peer address. The result is stored under
//! [`CLIENT_IP_KEY`] as a `String` for downstream handlers and the
//! request logger.
//!
//! Resolution order:
//!
//! 1. First entry of `x-forwarded-for`
//! 2. `x-real-ip`
//! 3. The connection's peer address

use portico_core::{BoxFuture, Context, Handler};

/// The context store key holding the client IP as a `String`.
pub const CLIENT_IP_KEY: &str = "client_ip";

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
const REAL_IP_HEADER: &str = "x-real-ip";

/// Middleware that resolves the client IP.
#[derive(Debug, Clone, Default)]
pub struct RealIp;

impl RealIp {
    /// Creates a new client IP stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn resolve(ctx: &Context) -> String {
        if let Some(forwarded) = ctx.request_header(FORWARDED_FOR_HEADER) {
            if let Some(first) = forwarded.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }
        if let Some(real_ip) = ctx.request_header(REAL_IP_HEADER) {
            let real_ip = real_ip.trim();
            if !real_ip.is_empty() {
                return real_ip.to_string();
            }
        }
        ctx.remote_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_default()
    }
}

impl Handler for RealIp {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let ip = Self::resolve(ctx);
            ctx.set(CLIENT_IP_KEY, ip);
            ctx.next().await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, Method, StatusCode};
    use portico_core::{handler_fn, Chain, HandlerFunc};
    use std::net::SocketAddr;
    use std::sync::Arc;

    async fn record(ctx: &mut Context) {
        let ip = ctx.get::<String>(CLIENT_IP_KEY).cloned().unwrap_or_default();
        ctx.string(StatusCode::OK, ip);
    }

    async fn run(headers: HeaderMap, peer: Option<&str>) -> Context {
        let chain: Chain =
            vec![Arc::new(RealIp::new()) as HandlerFunc, handler_fn(record)].into();
        let mut ctx = Context::new(Method::GET, "/".parse().unwrap(), headers, Bytes::new());
        ctx.set_chain(chain);
        if let Some(peer) = peer {
            ctx.set_remote_addr(peer.parse::<SocketAddr>().unwrap());
        }
        ctx.run().await;
        ctx
    }

    #[tokio::test]
    async fn test_forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            FORWARDED_FOR_HEADER,
            "203.0.113.7, 10.0.0.1, 10.0.0.2".parse().unwrap(),
        );
        let ctx = run(headers, Some("10.0.0.2:9999")).await;
        assert_eq!(ctx.response_body(), b"203.0.113.7");
    }

    #[tokio::test]
    async fn test_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(REAL_IP_HEADER, "198.51.100.4".parse().unwrap());
        let ctx = run(headers, Some("10.0.0.2:9999")).await;
        assert_eq!(ctx.response_body(), b"198.51.100.4");
    }

    #[tokio::test]
    async fn test_peer_address_fallback() {
        let ctx = run(HeaderMap::new(), Some("192.0.2.9:4242")).await;
        assert_eq!(ctx.response_body(), b"192.0.2.9");
    }

    #[tokio::test]
    async fn test_no_source_at_all() {
        let ctx = run(HeaderMap::new(), None).await;
        assert_eq!(ctx.response_body(), b"");
    }
}
