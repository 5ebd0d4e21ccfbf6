//! Core types for the Portico web framework.
//!
//! This crate defines the per-request [`Context`], the [`Handler`] trait
//! shared by middleware and terminal handlers, the captured-path
//! [`Params`], and the [`AssetReader`] seam for static assets.
//!
//! # Execution model
//!
//! A request is served by a *chain*: an ordered sequence of handlers
//! fixed at route-registration time. Each handler receives the mutable
//! [`Context`] and explicitly drives descent with
//! [`Context::next`]; a handler that never calls `next` stops the chain,
//! and [`Context::abort`] prevents any further descent while the stack
//! unwinds normally.
//!
//! ```
//! use http::StatusCode;
//! use portico_core::{handler_fn, Chain, Context};
//!
//! async fn greet(ctx: &mut Context) {
//!     ctx.string(StatusCode::OK, "hello");
//! }
//!
//! # tokio_test::block_on(async {
//! let chain: Chain = vec![handler_fn(greet)].into();
//! let mut ctx = Context::for_chain(http::Method::GET, "/hello", chain);
//! ctx.run().await;
//! assert_eq!(ctx.response_body(), b"hello");
//! # });
//! ```

pub mod assets;
pub mod context;
pub mod handler;
pub mod params;

pub use assets::{mime_for_path, AssetReader, FsAssetReader, NoAssets};
pub use context::Context;
pub use handler::{boxed_handler, handler_fn, BoxFuture, Chain, Handler, HandlerFunc};
pub use params::Params;
