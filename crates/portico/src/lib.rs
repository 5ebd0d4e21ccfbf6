//! Portico is an opinionated web framework for building full-stack
//! applications.
//!
//! An application is a [`Server`](portico_server::Server) with a fixed
//! stack of fifteen global middleware, a radix-tree router with groups
//! and path captures, dual HTTP/HTTPS listeners with graceful shutdown,
//! and first-class mounting for single-page-app proxies and GraphQL
//! endpoints (including WebSocket subscriptions).
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use portico::prelude::*;
//!
//! async fn hello(ctx: &mut Context) {
//!     let name = ctx.param("name").to_owned();
//!     ctx.string(StatusCode::OK, format!("hello, {name}"));
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::app(AppConfig::development(), Arc::new(NoAssets));
//!     server.get("/greet/:name", &[handler_fn(hello)]);
//!
//!     for line in server.info() {
//!         println!("{line}");
//!     }
//!     server.listen().await?;
//!     Ok(())
//! }
//! ```
//!
//! Handlers receive a mutable [`Context`](portico_core::Context) and
//! drive chain descent explicitly with `ctx.next().await`; middleware
//! are ordinary handlers that do work on either side of that call. See
//! the `portico-core` crate docs for the execution model and
//! `portico-test` for the in-process test client.

pub use portico_config as config;
pub use portico_core as core;
pub use portico_middleware as middleware;
pub use portico_router as router;
pub use portico_server as server;
pub use portico_telemetry as telemetry;
pub use portico_ws as ws;

pub use http;

/// Convenient imports for application code.
///
/// ```
/// use portico::prelude::*;
/// ```
pub mod prelude {
    pub use http::{Method, StatusCode};

    pub use portico_config::{AppConfig, GqlConfig, SpaConfig};
    pub use portico_core::{
        boxed_handler, handler_fn, AssetReader, Chain, Context, FsAssetReader, Handler,
        HandlerFunc, NoAssets, Params,
    };
    pub use portico_middleware::default_stack;
    pub use portico_router::{Route, Router, RouterGroup};
    pub use portico_server::{Server, ServerError, ServerResult, ShutdownSignal};
    pub use portico_telemetry::{init_logging, LogConfig};
    pub use portico_ws::{CloseCode, Message, WebSocket, WsError, WsResult};
}
