//! Secure response headers middleware.
//!
//! Writes the standard browser hardening headers before the chain runs,
//! so handlers may still override them:
//!
//! - `X-Content-Type-Options: nosniff`
//! - `X-Frame-Options: DENY`
//! - `X-XSS-Protection: 1; mode=block`
//! - `Strict-Transport-Security` when the server terminates TLS

use portico_core::{BoxFuture, Context, Handler};

const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";

/// Middleware that writes browser hardening headers.
#[derive(Debug, Clone, Default)]
pub struct SecureHeaders {
    hsts: bool,
}

impl SecureHeaders {
    /// Creates a secure headers stage without HSTS.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a secure headers stage that also writes
    /// `Strict-Transport-Security`. Only meaningful behind TLS.
    #[must_use]
    pub fn with_hsts() -> Self {
        Self { hsts: true }
    }
}

impl Handler for SecureHeaders {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            ctx.header("x-content-type-options", "nosniff");
            ctx.header("x-frame-options", "DENY");
            ctx.header("x-xss-protection", "1; mode=block");
            if self.hsts {
                ctx.header("strict-transport-security", HSTS_VALUE);
            }
            ctx.next().await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use portico_core::{handler_fn, Chain, HandlerFunc};
    use std::sync::Arc;

    async fn ok(ctx: &mut Context) {
        ctx.string(StatusCode::OK, "ok");
    }

    async fn run(stage: SecureHeaders) -> Context {
        let chain: Chain = vec![Arc::new(stage) as HandlerFunc, handler_fn(ok)].into();
        let mut ctx = Context::for_chain(Method::GET, "/", chain);
        ctx.run().await;
        ctx
    }

    #[tokio::test]
    async fn test_headers_written() {
        let ctx = run(SecureHeaders::new()).await;
        assert_eq!(ctx.response_header("x-content-type-options"), Some("nosniff"));
        assert_eq!(ctx.response_header("x-frame-options"), Some("DENY"));
        assert_eq!(ctx.response_header("x-xss-protection"), Some("1; mode=block"));
        assert!(ctx.response_header("strict-transport-security").is_none());
    }

    #[tokio::test]
    async fn test_hsts_when_enabled() {
        let ctx = run(SecureHeaders::with_hsts()).await;
        assert_eq!(
            ctx.response_header("strict-transport-security"),
            Some(HSTS_VALUE)
        );
    }

    #[tokio::test]
    async fn test_handler_can_override() {
        async fn override_frame(ctx: &mut Context) {
            ctx.header("x-frame-options", "SAMEORIGIN");
            ctx.string(StatusCode::OK, "ok");
        }

        let chain: Chain = vec![
            Arc::new(SecureHeaders::new()) as HandlerFunc,
            handler_fn(override_frame),
        ]
        .into();
        let mut ctx = Context::for_chain(Method::GET, "/", chain);
        ctx.run().await;

        assert_eq!(ctx.response_header("x-frame-options"), Some("SAMEORIGIN"));
    }
}
