//! CORS (Cross-Origin Resource Sharing) middleware.
//!
//! Validates the `Origin` header against the configured allow-list and
//! writes the `Access-Control-*` response headers. Preflight `OPTIONS`
//! requests are answered directly with `204 No Content` and never reach
//! routing.
//!
//! A disallowed origin is not an error here: the response simply carries
//! no CORS headers, and the browser enforces the block.

use http::{Method, StatusCode};
use portico_core::{BoxFuture, Context, Handler};
use portico_config::CorsConfig;

/// CORS header names.
pub mod headers {
    /// `Access-Control-Allow-Origin` header.
    pub const ALLOW_ORIGIN: &str = "access-control-allow-origin";
    /// `Access-Control-Allow-Methods` header.
    pub const ALLOW_METHODS: &str = "access-control-allow-methods";
    /// `Access-Control-Allow-Headers` header.
    pub const ALLOW_HEADERS: &str = "access-control-allow-headers";
    /// `Access-Control-Max-Age` header.
    pub const MAX_AGE: &str = "access-control-max-age";
    /// `Access-Control-Request-Method` header (preflight).
    pub const REQUEST_METHOD: &str = "access-control-request-method";
    /// `Origin` header.
    pub const ORIGIN: &str = "origin";
    /// `Vary` header.
    pub const VARY: &str = "vary";
}

/// Middleware that enforces the CORS allow-list.
#[derive(Debug, Clone)]
pub struct Cors {
    config: CorsConfig,
}

impl Cors {
    /// Creates a CORS stage from its config section.
    #[must_use]
    pub fn new(config: CorsConfig) -> Self {
        Self { config }
    }

    fn allows_any(&self) -> bool {
        self.config.allowed_origins.iter().any(|o| o == "*")
    }

    fn allow_origin_value(&self, origin: &str) -> Option<String> {
        if self.allows_any() {
            return Some("*".to_string());
        }
        self.config
            .allowed_origins
            .iter()
            .any(|allowed| allowed == origin)
            .then(|| origin.to_string())
    }

    fn write_preflight_headers(&self, ctx: &mut Context, allow_origin: &str) {
        ctx.header(headers::ALLOW_ORIGIN, allow_origin);
        ctx.header(headers::ALLOW_METHODS, self.config.allowed_methods.join(", "));
        ctx.header(headers::ALLOW_HEADERS, self.config.allowed_headers.join(", "));
        ctx.header(headers::MAX_AGE, self.config.max_age_secs.to_string());
    }
}

impl Handler for Cors {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let origin = ctx.request_header(headers::ORIGIN).map(ToString::to_string);

            let Some(origin) = origin else {
                // Same-origin request; nothing to negotiate.
                ctx.next().await;
                return;
            };

            let allow_origin = self.allow_origin_value(&origin);
            let is_preflight = ctx.method() == Method::OPTIONS
                && ctx.request_header(headers::REQUEST_METHOD).is_some();

            if is_preflight {
                if let Some(value) = allow_origin {
                    self.write_preflight_headers(ctx, &value);
                }
                ctx.add_header(headers::VARY, "Origin");
                ctx.abort_with_status(StatusCode::NO_CONTENT);
                return;
            }

            if let Some(value) = allow_origin {
                ctx.header(headers::ALLOW_ORIGIN, value);
            }
            ctx.add_header(headers::VARY, "Origin");
            ctx.next().await;
        })
    }
}
