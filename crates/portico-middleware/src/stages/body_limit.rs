//! Request body size limit middleware.
//!
//! Rejects requests whose body exceeds the configured maximum with
//! `413 Payload Too Large`. The listener applies the same limit while
//! reading from the wire; this stage covers dispatch paths that hand
//! the body over directly, such as the in-process test harness.

use http::StatusCode;
use portico_core::{BoxFuture, Context, Handler};

/// Middleware that enforces a maximum request body size.
#[derive(Debug, Clone)]
pub struct BodyLimit {
    max_bytes: usize,
}

impl BodyLimit {
    /// Creates a body limit stage allowing at most `max_bytes`.
    #[must_use]
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl Handler for BodyLimit {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if ctx.body().len() > self.max_bytes {
                ctx.string(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large");
                ctx.abort();
            } else {
                ctx.next().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, Method};
    use portico_core::{handler_fn, Chain, HandlerFunc};
    use std::sync::Arc;

    async fn echo_len(ctx: &mut Context) {
        let len = ctx.body().len().to_string();
        ctx.string(StatusCode::OK, len);
    }

    async fn run(limit: usize, body: &[u8]) -> Context {
        let chain: Chain =
            vec![Arc::new(BodyLimit::new(limit)) as HandlerFunc, handler_fn(echo_len)].into();
        let mut ctx = Context::new(
            Method::POST,
            "/upload".parse().unwrap(),
            HeaderMap::new(),
            Bytes::copy_from_slice(body),
        );
        ctx.set_chain(chain);
        ctx.run().await;
        ctx
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let ctx = run(4, b"too big").await;
        assert_eq!(ctx.response_status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(ctx.is_aborted());
    }

    #[tokio::test]
    async fn test_body_at_limit_allowed() {
        let ctx = run(4, b"just").await;
        assert_eq!(ctx.response_status(), StatusCode::OK);
        assert_eq!(ctx.response_body(), b"4");
    }

    #[tokio::test]
    async fn test_empty_body_allowed() {
        let ctx = run(0, b"").await;
        assert_eq!(ctx.response_status(), StatusCode::OK);
    }
}
