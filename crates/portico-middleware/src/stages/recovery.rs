//! Panic recovery middleware.
//!
//! Catches panics from anywhere further down the chain and converts them
//! into a `500 Internal Server Error` response. The panic detail is
//! always logged; it only appears in the response body in development
//! mode.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use http::StatusCode;
use portico_core::{BoxFuture, Context, Handler};
use tracing::error;

/// Middleware that converts handler panics into 500 responses.
///
/// This must be the outermost stage: everything it does not wrap is not
/// protected.
#[derive(Debug, Clone, Default)]
pub struct Recovery {
    /// Whether to include the panic message in the response body.
    show_detail: bool,
}

impl Recovery {
    /// Creates a recovery stage that hides panic details from clients.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a recovery stage that includes the panic message in the
    /// response body. Development only.
    #[must_use]
    pub fn with_detail() -> Self {
        Self { show_detail: true }
    }

    fn error_page(&self, detail: &str) -> String {
        let body = if self.show_detail {
            format!("<p>The server encountered an error.</p>\n<pre>{}</pre>", escape_html(detail))
        } else {
            "<p>The server encountered an error.</p>".to_string()
        };
        format!(
            "<!DOCTYPE html>\n<html>\n<head><title>500 Internal Server Error</title></head>\n<body>\n<h1>Internal Server Error</h1>\n{body}\n</body>\n</html>\n"
        )
    }
}

impl Handler for Recovery {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let result = AssertUnwindSafe(ctx.next()).catch_unwind().await;
            if let Err(panic) = result {
                let detail = panic_message(panic.as_ref());
                error!(
                    http.method = %ctx.method(),
                    http.path = ctx.path(),
                    panic = %detail,
                    "handler panicked"
                );
                ctx.reset_response();
                ctx.abort();
                ctx.html(StatusCode::INTERNAL_SERVER_ERROR, self.error_page(&detail));
            }
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
