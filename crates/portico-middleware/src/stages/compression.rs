//! Response compression middleware.
//!
//! Gzips the response body when the client accepts it, the body is large
//! enough to be worth it, and the content type is compressible. Already
//! encoded responses are left alone. `Vary: Accept-Encoding` is written
//! whenever the response could have differed by encoding.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use portico_core::{BoxFuture, Context, Handler};
use tracing::warn;

/// Response bodies smaller than this are not worth compressing.
pub const DEFAULT_MIN_SIZE: usize = 1024;

const COMPRESSIBLE_TYPES: &[&str] = &[
    "text/plain",
    "text/html",
    "text/css",
    "text/csv",
    "text/javascript",
    "text/xml",
    "application/json",
    "application/javascript",
    "application/xml",
    "application/xhtml+xml",
    "application/graphql",
    "image/svg+xml",
];

/// Middleware that gzips compressible responses.
#[derive(Debug, Clone)]
pub struct Compressor {
    min_size: usize,
    level: Compression,
}

impl Default for Compressor {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_SIZE,
            level: Compression::default(),
        }
    }
}

impl Compressor {
    /// Creates a compression stage with the default threshold and level.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a compression stage with a custom minimum body size.
    #[must_use]
    pub fn with_min_size(min_size: usize) -> Self {
        Self {
            min_size,
            ..Self::default()
        }
    }

    fn client_accepts_gzip(accept_encoding: &str) -> bool {
        accept_encoding.split(',').any(|part| {
            let part = part.trim();
            let mut pieces = part.split(';');
            let name = pieces.next().unwrap_or("").trim();
            if !name.eq_ignore_ascii_case("gzip") {
                return false;
            }
            // Reject an explicit q=0.
            pieces
                .find_map(|p| p.trim().strip_prefix("q="))
                .and_then(|q| q.trim().parse::<f32>().ok())
                .map_or(true, |q| q > 0.0)
        })
    }

    fn is_compressible(content_type: &str) -> bool {
        let base = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_ascii_lowercase();
        COMPRESSIBLE_TYPES.contains(&base.as_str())
    }

    fn gzip(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), self.level);
        encoder.write_all(data)?;
        encoder.finish()
    }
}

impl Handler for Compressor {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let accepts_gzip = ctx
                .request_header("accept-encoding")
                .is_some_and(Self::client_accepts_gzip);

            ctx.next().await;

            if !accepts_gzip {
                return;
            }
            ctx.add_header("vary", "Accept-Encoding");

            if ctx.response_header("content-encoding").is_some()
                || ctx.response_body().len() < self.min_size
                || !ctx
                    .response_header("content-type")
                    .is_some_and(Self::is_compressible)
            {
                return;
            }

            match self.gzip(ctx.response_body()) {
                Ok(compressed) => {
                    ctx.replace_body(&compressed);
                    ctx.header("content-encoding", "gzip");
                }
                Err(err) => {
                    // Uncompressed response is still correct.
                    warn!(error = %err, "response compression failed");
                }
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
    use std::io::Read;
    use std::sync::Arc;

    async fn big_json(ctx: &mut Context) {
        let body = format!("{{\"data\":\"{}\"}}", "x".repeat(4096));
        ctx.data(StatusCode::OK, "application/json", body.as_bytes());
    }

    async fn tiny_text(ctx: &mut Context) {
        ctx.string(StatusCode::OK, "hi");
    }

    async fn run(terminal: HandlerFunc, accept_encoding: Option<&str>) -> Context {
        let chain: Chain = vec![Arc::new(Compressor::new()) as HandlerFunc, terminal].into();
        let mut headers = HeaderMap::new();
        if let Some(value) = accept_encoding {
            headers.insert("accept-encoding", value.parse().unwrap());
        }
        let mut ctx = Context::new(Method::GET, "/".parse().unwrap(), headers, Bytes::new());
        ctx.set_chain(chain);
        ctx.run().await;
        ctx
    }

    fn gunzip(data: &[u8]) -> Vec<u8> {
        let mut decoder = flate2::read::GzDecoder::new(data);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        out
    }

    #[tokio::test]
    async fn test_large_json_compressed() {
        let ctx = run(handler_fn(big_json), Some("gzip, deflate, br")).await;

        assert_eq!(ctx.response_header("content-encoding"), Some("gzip"));
        assert_eq!(ctx.response_header("vary"), Some("Accept-Encoding"));
        let decompressed = gunzip(ctx.response_body());
        assert!(decompressed.starts_with(b"{\"data\":\"xxx"));
        assert!(ctx.response_body().len() < decompressed.len());
    }

    #[tokio::test]
    async fn test_small_body_untouched() {
        let ctx = run(handler_fn(tiny_text), Some("gzip")).await;

        assert!(ctx.response_header("content-encoding").is_none());
        assert_eq!(ctx.response_body(), b"hi");
    }

    #[tokio::test]
    async fn test_client_without_gzip_untouched() {
        let ctx = run(handler_fn(big_json), None).await;

        assert!(ctx.response_header("content-encoding").is_none());
        assert!(ctx.response_header("vary").is_none());
    }

    #[tokio::test]
    async fn test_gzip_q_zero_rejected() {
        let ctx = run(handler_fn(big_json), Some("gzip;q=0, identity")).await;

        assert!(ctx.response_header("content-encoding").is_none());
    }

    #[tokio::test]
    async fn test_incompressible_type_untouched() {
        async fn big_png(ctx: &mut Context) {
            ctx.data(StatusCode::OK, "image/png", &[0u8; 4096]);
        }

        let ctx = run(handler_fn(big_png), Some("gzip")).await;
        assert!(ctx.response_header("content-encoding").is_none());
    }

    #[tokio::test]
    async fn test_already_encoded_untouched() {
        async fn pre_encoded(ctx: &mut Context) {
            ctx.header("content-encoding", "br");
            ctx.data(StatusCode::OK, "text/html", &[b'x'; 4096]);
        }

        let ctx = run(handler_fn(pre_encoded), Some("gzip")).await;
        assert_eq!(ctx.response_header("content-encoding"), Some("br"));
    }

    #[test]
    fn test_accept_encoding_parsing() {
        assert!(Compressor::client_accepts_gzip("gzip"));
        assert!(Compressor::client_accepts_gzip("deflate, GZIP;q=0.5"));
        assert!(!Compressor::client_accepts_gzip("br, deflate"));
        assert!(!Compressor::client_accepts_gzip("gzip;q=0"));
    }

    #[test]
    fn test_compressible_types() {
        assert!(Compressor::is_compressible("application/json"));
        assert!(Compressor::is_compressible("text/html; charset=utf-8"));
        assert!(!Compressor::is_compressible("image/png"));
        assert!(!Compressor::is_compressible("application/gzip"));
    }
}
