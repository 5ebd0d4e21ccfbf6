//! Response header filter middleware.
//!
//! Removes a configured set of response headers after the chain runs.
//! Used to keep implementation details like `X-Powered-By` out of
//! responses regardless of which handler produced them.

use portico_core::{BoxFuture, Context, Handler};

/// Middleware that removes named response headers.
#[derive(Debug, Clone)]
pub struct HeaderFilter {
    remove: Vec<String>,
}

impl Default for HeaderFilter {
    fn default() -> Self {
        Self {
            remove: vec!["x-powered-by".to_string()],
        }
    }
}

impl HeaderFilter {
    /// Creates a filter with the default removal list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filter removing the given header names.
    #[must_use]
    pub fn removing<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            remove: names.into_iter().map(|n| n.into().to_ascii_lowercase()).collect(),
        }
    }
}

impl Handler for HeaderFilter {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            ctx.next().await;
            for name in &self.remove {
                ctx.remove_header(name);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use portico_core::{handler_fn, Chain, HandlerFunc};
    use std::sync::Arc;

    async fn leaky(ctx: &mut Context) {
        ctx.header("x-powered-by", "portico");
        ctx.header("x-internal-shard", "7");
        ctx.string(StatusCode::OK, "ok");
    }

    async fn run(filter: HeaderFilter) -> Context {
        let chain: Chain = vec![Arc::new(filter) as HandlerFunc, handler_fn(leaky)].into();
        let mut ctx = Context::for_chain(Method::GET, "/", chain);
        ctx.run().await;
        ctx
    }

    #[tokio::test]
    async fn test_default_removes_powered_by() {
        let ctx = run(HeaderFilter::new()).await;
        assert!(ctx.response_header("x-powered-by").is_none());
        assert_eq!(ctx.response_header("x-internal-shard"), Some("7"));
    }

    #[tokio::test]
    async fn test_custom_list() {
        let ctx = run(HeaderFilter::removing(["X-Internal-Shard"])).await;
        assert_eq!(ctx.response_header("x-powered-by"), Some("portico"));
        assert!(ctx.response_header("x-internal-shard").is_none());
    }
}
