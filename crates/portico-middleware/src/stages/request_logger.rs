//! Request logging middleware.
//!
//! Emits one structured log line per request after the chain completes,
//! carrying the method, path, status, latency, and the correlation
//! fields stored by the request ID and client IP stages.

use std::time::Instant;

use portico_core::{BoxFuture, Context, Handler};
use tracing::info;

use super::real_ip::CLIENT_IP_KEY;
use super::request_id::REQUEST_ID_KEY;

/// Middleware that logs each request on completion.
#[derive(Debug, Clone, Default)]
pub struct RequestLogger;

impl RequestLogger {
    /// Creates a new request logger stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Handler for RequestLogger {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let started = Instant::now();
            let method = ctx.method().clone();
            let path = ctx.path().to_string();

            ctx.next().await;

            let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
            let request_id = ctx
                .get::<String>(REQUEST_ID_KEY)
                .map_or("", String::as_str);
            let client_ip = ctx
                .get::<String>(CLIENT_IP_KEY)
                .map_or("", String::as_str);

            info!(
                http.method = %method,
                http.path = %path,
                http.status_code = ctx.response_status().as_u16(),
                duration_ms = latency_ms,
                request_id,
                client_ip,
                "request completed"
            );
        })
    }
}
