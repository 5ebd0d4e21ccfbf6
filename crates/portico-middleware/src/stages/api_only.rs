//! API-only response middleware.
//!
//! Clients that send the [`API_ONLY_HEADER`] declare they authenticate
//! with headers, not cookies. For those requests, any `Set-Cookie` the
//! chain produced (session id, CSRF token) is stripped from the
//! response. The CSRF stage also reads this header to skip its check.

use portico_core::{BoxFuture, Context, Handler};

/// The request header marking an API-only client, e.g. `x-api-only: 1`.
pub const API_ONLY_HEADER: &str = "x-api-only";

/// Middleware that strips cookies from API-only responses.
#[derive(Debug, Clone, Default)]
pub struct ApiOnly;

impl ApiOnly {
    /// Creates a new API-only stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Handler for ApiOnly {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let api_only = ctx.request_header(API_ONLY_HEADER).is_some();
            ctx.next().await;
            if api_only {
                ctx.remove_header("set-cookie");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, Method, StatusCode};
    use portico_core::{handler_fn, Chain, HandlerFunc};
    use std::sync::Arc;

    async fn set_cookies(ctx: &mut Context) {
        ctx.add_header("set-cookie", "_session_id=abc; Path=/");
        ctx.add_header("set-cookie", "_csrf_token=def; Path=/");
        ctx.string(StatusCode::OK, "ok");
    }

    async fn run(headers: HeaderMap) -> Context {
        let chain: Chain =
            vec![Arc::new(ApiOnly::new()) as HandlerFunc, handler_fn(set_cookies)].into();
        let mut ctx = Context::new(Method::GET, "/".parse().unwrap(), headers, Bytes::new());
        ctx.set_chain(chain);
        ctx.run().await;
        ctx
    }

    #[tokio::test]
    async fn test_cookies_stripped_for_api_clients() {
        let mut headers = HeaderMap::new();
        headers.insert(API_ONLY_HEADER, "1".parse().unwrap());
        let ctx = run(headers).await;

        assert_eq!(ctx.response_status(), StatusCode::OK);
        assert!(ctx.response_header("set-cookie").is_none());
    }

    #[tokio::test]
    async fn test_cookies_kept_for_browser_clients() {
        let ctx = run(HeaderMap::new()).await;

        let cookies: Vec<_> = ctx.response_headers().get_all("set-cookie").iter().collect();
        assert_eq!(cookies.len(), 2);
    }
}
