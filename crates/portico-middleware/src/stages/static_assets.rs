//! Static asset middleware.
//!
//! Serves `GET` requests under the configured prefix through the
//! [`AssetReader`] seam, with the content type inferred from the file
//! extension. A path that does not resolve to an asset falls through to
//! routing, so routes may live under the same prefix.

use std::io;
use std::sync::Arc;

use http::{Method, StatusCode};
use portico_core::{mime_for_path, AssetReader, BoxFuture, Context, Handler};
use tracing::error;

/// Middleware that serves static assets under a path prefix.
#[derive(Clone)]
pub struct StaticAssets {
    reader: Arc<dyn AssetReader>,
    prefix: String,
}

impl StaticAssets {
    /// Creates a static asset stage serving `reader` under `prefix`.
    #[must_use]
    pub fn new(reader: Arc<dyn AssetReader>, prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        while prefix.ends_with('/') {
            prefix.pop();
        }
        Self { reader, prefix }
    }

    /// The asset path within the reader for a request path, when the
    /// request falls under the prefix.
    fn asset_path<'p>(&self, path: &'p str) -> Option<&'p str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        let rest = rest.strip_prefix('/')?;
        (!rest.is_empty()).then_some(rest)
    }
}

impl std::fmt::Debug for StaticAssets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticAssets")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl Handler for StaticAssets {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if ctx.method() != Method::GET {
                ctx.next().await;
                return;
            }
            let Some(asset) = self.asset_path(ctx.path()).map(ToString::to_string) else {
                ctx.next().await;
                return;
            };

            match self.reader.read(&asset) {
                Ok(bytes) => {
                    ctx.data(StatusCode::OK, mime_for_path(&asset), &bytes);
                    ctx.abort();
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    ctx.next().await;
                }
                Err(err) => {
                    error!(asset = %asset, error = %err, "failed to read asset");
                    ctx.abort_with_status(StatusCode::INTERNAL_SERVER_ERROR);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use portico_core::{handler_fn, Chain, HandlerFunc};
    use std::collections::HashMap;

    struct MapAssets {
        files: HashMap<&'static str, &'static [u8]>,
    }

    impl AssetReader for MapAssets {
        fn read(&self, path: &str) -> io::Result<Bytes> {
            self.files
                .get(path)
                .map(|data| Bytes::from_static(data))
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
        }

        fn exists(&self, path: &str) -> bool {
            self.files.contains_key(path)
        }
    }

    fn assets() -> Arc<dyn AssetReader> {
        let mut files: HashMap<&'static str, &'static [u8]> = HashMap::new();
        files.insert("app.js", b"console.log(1)");
        files.insert("css/site.css", b"body{}");
        Arc::new(MapAssets { files })
    }

    async fn run(method: Method, path: &str) -> Context {
        async fn mark(ctx: &mut Context) {
            ctx.set("routed", true);
            ctx.string(StatusCode::OK, "routed");
        }

        let chain: Chain = vec![
            Arc::new(StaticAssets::new(assets(), "/assets")) as HandlerFunc,
            handler_fn(mark),
        ]
        .into();
        let mut ctx = Context::for_chain(method, path, chain);
        ctx.run().await;
        ctx
    }

    #[tokio::test]
    async fn test_serves_known_asset() {
        let ctx = run(Method::GET, "/assets/app.js").await;

        assert_eq!(ctx.response_status(), StatusCode::OK);
        assert_eq!(ctx.response_body(), b"console.log(1)");
        assert_eq!(
            ctx.response_header("content-type"),
            Some("application/javascript; charset=utf-8")
        );
        assert!(ctx.is_aborted());
    }

    #[tokio::test]
    async fn test_nested_asset_gets_css_type() {
        let ctx = run(Method::GET, "/assets/css/site.css").await;
        assert_eq!(
            ctx.response_header("content-type"),
            Some("text/css; charset=utf-8")
        );
    }

    #[tokio::test]
    async fn test_unknown_asset_falls_through() {
        let ctx = run(Method::GET, "/assets/missing.js").await;
        assert!(ctx.get::<bool>("routed").is_some());
    }

    #[tokio::test]
    async fn test_outside_prefix_falls_through() {
        let ctx = run(Method::GET, "/api/users").await;
        assert!(ctx.get::<bool>("routed").is_some());
    }

    #[tokio::test]
    async fn test_bare_prefix_falls_through() {
        let ctx = run(Method::GET, "/assets").await;
        assert!(ctx.get::<bool>("routed").is_some());
    }

    #[tokio::test]
    async fn test_post_ignored() {
        let ctx = run(Method::POST, "/assets/app.js").await;
        assert!(ctx.get::<bool>("routed").is_some());
    }
}
