//! In-process HTTP testing for Portico servers.
//!
//! [`TestClient`] dispatches requests directly into a
//! [`Server`](portico_server::Server) without binding a socket, so tests
//! exercise the full routing and middleware pipeline with no network
//! setup. Requests are built fluently and responses come back as a
//! buffered [`TestResponse`] with chainable assertions.
//!
//! ```
//! use std::sync::Arc;
//!
//! use http::StatusCode;
//! use portico_config::AppConfig;
//! use portico_core::{handler_fn, Context, NoAssets};
//! use portico_server::Server;
//! use portico_test::TestClient;
//!
//! async fn hello(ctx: &mut Context) {
//!     ctx.string(StatusCode::OK, "hello from portico");
//! }
//!
//! # tokio_test::block_on(async {
//! let server = Server::new(AppConfig::test(), Arc::new(NoAssets));
//! server.get("/hello", &[handler_fn(hello)]);
//!
//! let client = TestClient::new(server);
//! let response = client.get("/hello").send().await;
//! response
//!     .assert_status(StatusCode::OK)
//!     .assert_body_contains("hello from portico");
//! # });
//! ```

mod client;
mod error;
mod response;

pub use client::{TestClient, TestRequestBuilder};
pub use error::TestError;
pub use response::TestResponse;
