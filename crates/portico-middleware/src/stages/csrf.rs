//! CSRF protection middleware.
//!
//! Double-submit cookie scheme: safe requests receive a random token in
//! a cookie, and unsafe requests must echo that token back in either the
//! configured header or a form field. A missing or mismatched token is
//! answered with a `403` HTML error page.
//!
//! Requests carrying the API-only header are exempt. API clients
//! authenticate with headers rather than cookies, so the attack this
//! stage defends against does not apply to them, and the cross-origin
//! request that could forge the header is already stopped by CORS.

use http::{Method, StatusCode};
use portico_core::{BoxFuture, Context, Handler};
use portico_config::CsrfConfig;
use rand::RngCore;

use super::api_only::API_ONLY_HEADER;
use crate::cookies::{build_cookie, request_cookie};

const FORBIDDEN_PAGE: &str = "<!DOCTYPE html>\n<html>\n<head><title>403 Forbidden</title></head>\n<body>\n<h1>Forbidden</h1>\n<p>CSRF token missing or invalid.</p>\n</body>\n</html>\n";

/// Middleware that enforces double-submit CSRF tokens.
#[derive(Debug, Clone)]
pub struct Csrf {
    config: CsrfConfig,
}

impl Csrf {
    /// Creates a CSRF stage from its config section.
    #[must_use]
    pub fn new(config: CsrfConfig) -> Self {
        Self { config }
    }

    fn mint_token() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex_encode(&bytes)
    }

    fn is_safe(method: &Method) -> bool {
        matches!(
            *method,
            Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
        )
    }

    /// The token the client submitted, from the header or a form field.
    fn submitted_token(&self, ctx: &Context) -> Option<String> {
        if let Some(token) = ctx.request_header(&self.config.header_name) {
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }

        let content_type = ctx.request_header("content-type").unwrap_or("");
        if !content_type.starts_with("application/x-www-form-urlencoded") {
            return None;
        }
        let body = std::str::from_utf8(ctx.body()).ok()?;
        for pair in body.split('&') {
            let mut parts = pair.splitn(2, '=');
            if parts.next() == Some(self.config.field_name.as_str()) {
                let raw = parts.next().unwrap_or("");
                return urlencoding::decode(&raw.replace('+', " "))
                    .ok()
                    .map(|v| v.into_owned());
            }
        }
        None
    }

    fn refresh_cookie(&self, ctx: &mut Context, token: &str) {
        // Not HttpOnly: browser clients read this cookie to echo the
        // token in the header.
        ctx.add_header(
            "set-cookie",
            build_cookie(&self.config.cookie_name, token, self.config.ttl_secs, false),
        );
    }
}

impl Handler for Csrf {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if ctx.request_header(API_ONLY_HEADER).is_some() {
                ctx.next().await;
                return;
            }

            let cookie_token = request_cookie(ctx, &self.config.cookie_name)
                .filter(|token| !token.is_empty());

            if Self::is_safe(ctx.method()) {
                let token = cookie_token.unwrap_or_else(Self::mint_token);
                self.refresh_cookie(ctx, &token);
                ctx.next().await;
                return;
            }

            let valid = match (&cookie_token, self.submitted_token(ctx)) {
                (Some(cookie), Some(submitted)) => *cookie == submitted,
                _ => false,
            };
            if valid {
                ctx.next().await;
            } else {
                ctx.html(StatusCode::FORBIDDEN, FORBIDDEN_PAGE);
                ctx.abort();
            }
        })
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
