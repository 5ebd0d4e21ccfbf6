//! Health check middleware.
//!
//! Answers `GET` and `HEAD` on the configured path with an empty 200
//! before the request reaches routing. Load balancers poll this path at
//! high frequency, so it bypasses sessions, CSRF, and logging further
//! down the stack.

use http::{Method, StatusCode};
use portico_core::{BoxFuture, Context, Handler};

/// Middleware that answers health probes.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    path: String,
}

impl HealthCheck {
    /// Creates a health check stage answering on `path`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Handler for HealthCheck {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let is_probe = (ctx.method() == Method::GET || ctx.method() == Method::HEAD)
                && ctx.path() == self.path;
            if is_probe {
                ctx.abort_with_status(StatusCode::OK);
            } else {
                ctx.next().await;
            }
        })
    }
}
