//! Reverse proxy handler that forwards single-page-app routes to a
//! frontend dev server.

use std::time::Duration;

use http::{HeaderMap, StatusCode};
use portico_config::SpaConfig;
use portico_core::{BoxFuture, Context, Handler};

use crate::error::{ServerError, ServerResult};
use crate::pages;

/// Hop-by-hop headers that never cross the proxy in either direction.
const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Terminal handler that relays requests to the configured SPA upstream.
///
/// Any failure to reach the upstream, including the upstream being
/// unconfigured, renders as a 502 page.
#[derive(Debug, Clone)]
pub struct SpaProxy {
    client: reqwest::Client,
    upstream: Option<String>,
}

impl SpaProxy {
    /// Builds a proxy from the SPA config section.
    pub fn new(config: &SpaConfig) -> ServerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| ServerError::proxy(format!("cannot build proxy client: {err}")))?;
        Ok(Self {
            client,
            upstream: config.upstream.clone(),
        })
    }

    async fn forward(&self, ctx: &mut Context) {
        let Some(upstream) = self.upstream.as_deref() else {
            bad_gateway(ctx, "No frontend upstream is configured.");
            return;
        };

        let path_and_query = ctx
            .uri()
            .path_and_query()
            .map_or_else(|| ctx.path().to_owned(), |pq| pq.as_str().to_owned());
        let url = format!("{}{}", upstream.trim_end_matches('/'), path_and_query);

        let request = self
            .client
            .request(ctx.method().clone(), &url)
            .headers(upstream_headers(ctx.request_headers()))
            .body(ctx.body().clone());

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "frontend upstream unreachable");
                bad_gateway(ctx, "The frontend upstream did not respond.");
                return;
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "failed to read frontend upstream body");
                bad_gateway(ctx, "The frontend upstream response could not be read.");
                return;
            }
        };

        ctx.status(status);
        for (name, value) in &headers {
            if is_hop_by_hop(name.as_str()) || name.as_str() == "content-length" {
                continue;
            }
            if let Ok(value) = value.to_str() {
                ctx.add_header(name.as_str(), value);
            }
        }
        ctx.write_body(&body);
    }
}

impl Handler for SpaProxy {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(self.forward(ctx))
    }
}

fn bad_gateway(ctx: &mut Context, message: &str) {
    ctx.html(
        StatusCode::BAD_GATEWAY,
        pages::error_page(StatusCode::BAD_GATEWAY, message),
    );
}

fn upstream_headers(request_headers: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in request_headers {
        if is_hop_by_hop(name.as_str()) || name.as_str() == "host" {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|header| name.eq_ignore_ascii_case(header))
}
