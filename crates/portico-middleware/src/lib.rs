//! The standard middleware stack for Portico servers.
//!
//! Middleware here are plain [`Handler`]s that call
//! [`Context::next`](portico_core::Context::next) to hand control down
//! the chain (or don't, to stop it). Each stage lives in its own module
//! under [`stages`] and can be used alone; [`default_stack`] assembles
//! the full set a production app starts from.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use portico_config::AppConfig;
//! use portico_core::NoAssets;
//! use portico_middleware::default_stack;
//!
//! let config = AppConfig::development();
//! let stack = default_stack(&config, Arc::new(NoAssets));
//! assert_eq!(stack.len(), 15);
//! assert_eq!(stack[0].0, "recovery");
//! ```

#![warn(missing_docs)]

use std::sync::Arc;

use portico_config::AppConfig;
use portico_core::{AssetReader, HandlerFunc};

pub mod cookies;
pub mod stages;

pub use stages::{Session, SessionStore};

use stages::{
    ApiOnly, BodyLimit, Compressor, Cors, Csrf, HeaderFilter, HealthCheck, I18nLocale, RealIp,
    Recovery, RequestId, RequestLogger, SecureHeaders, StaticAssets,
};

/// Builds the default middleware stack from an application config.
///
/// Returns `(name, handler)` pairs in execution order. Order matters:
/// recovery wraps everything, correlation IDs come before logging, CSRF
/// runs after sessions, and static assets get the last word before
/// routing.
#[must_use]
pub fn default_stack(
    config: &AppConfig,
    assets: Arc<dyn AssetReader>,
) -> Vec<(&'static str, HandlerFunc)> {
    let recovery = if config.is_development() {
        Recovery::with_detail()
    } else {
        Recovery::new()
    };
    let secure_headers = if config.http.ssl_enabled {
        SecureHeaders::with_hsts()
    } else {
        SecureHeaders::new()
    };

    vec![
        ("recovery", Arc::new(recovery) as HandlerFunc),
        ("request_id", Arc::new(RequestId::new())),
        ("real_ip", Arc::new(RealIp::new())),
        ("request_logger", Arc::new(RequestLogger::new())),
        (
            "health_check",
            Arc::new(HealthCheck::new(config.http.health_check_path.clone())),
        ),
        (
            "body_limit",
            Arc::new(BodyLimit::new(config.http.max_body_bytes)),
        ),
        ("cors", Arc::new(Cors::new(config.cors.clone()))),
        ("secure_headers", Arc::new(secure_headers)),
        (
            "session",
            Arc::new(SessionStore::new(config.session.clone())),
        ),
        ("csrf", Arc::new(Csrf::new(config.csrf.clone()))),
        ("i18n_locale", Arc::new(I18nLocale::new(config.i18n.clone()))),
        ("api_only", Arc::new(ApiOnly::new())),
        ("compression", Arc::new(Compressor::new())),
        ("header_filter", Arc::new(HeaderFilter::new())),
        (
            "static_assets",
            Arc::new(StaticAssets::new(assets, config.assets.public_prefix.clone())),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_core::NoAssets;

    #[test]
    fn test_stack_has_fifteen_stages_in_order() {
        let stack = default_stack(&AppConfig::development(), Arc::new(NoAssets));
        let names: Vec<_> = stack.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec![
                "recovery",
                "request_id",
                "real_ip",
                "request_logger",
                "health_check",
                "body_limit",
                "cors",
                "secure_headers",
                "session",
                "csrf",
                "i18n_locale",
                "api_only",
                "compression",
                "header_filter",
                "static_assets",
            ]
        );
    }

    #[tokio::test]
    async fn test_full_stack_runs_end_to_end() {
        use http::{Method, StatusCode};
        use portico_core::{handler_fn, Chain, Context};

        async fn app(ctx: &mut Context) {
            ctx.string(StatusCode::OK, "through the whole stack");
        }

        let mut handlers: Vec<HandlerFunc> =
            default_stack(&AppConfig::development(), Arc::new(NoAssets))
                .into_iter()
                .map(|(_, handler)| handler)
                .collect();
        handlers.push(handler_fn(app));
        let chain: Chain = handlers.into();

        let mut ctx = Context::for_chain(Method::GET, "/anything", chain);
        ctx.run().await;

        assert_eq!(ctx.response_status(), StatusCode::OK);
        assert_eq!(ctx.response_body(), b"through the whole stack");
        // the stack left its fingerprints
        assert!(ctx.response_header("x-request-id").is_some());
        assert!(ctx.response_header("x-content-type-options").is_some());
        assert!(ctx.response_header("set-cookie").is_some());
    }

    #[tokio::test]
    async fn test_full_stack_health_probe() {
        use http::{Method, StatusCode};
        use portico_core::{Chain, Context};

        let handlers: Vec<HandlerFunc> =
            default_stack(&AppConfig::development(), Arc::new(NoAssets))
                .into_iter()
                .map(|(_, handler)| handler)
                .collect();
        let chain: Chain = handlers.into();

        let mut ctx = Context::for_chain(Method::GET, "/health", chain);
        ctx.run().await;

        assert_eq!(ctx.response_status(), StatusCode::OK);
        assert!(ctx.response_body().is_empty());
    }
}
