//! HTTP/HTTPS server for the portico framework.
//!
//! This crate ties the routing tree, the middleware stack, and hyper's
//! connection machinery together:
//!
//! - [`Server`] owns a router and mounts the built-in endpoints: the
//!   SPA reverse proxy, the GraphQL POST/WebSocket pair, and the
//!   playground page.
//! - [`ShutdownSignal`] and [`ConnectionTracker`] implement graceful
//!   shutdown: stop accepting, finish in-flight requests, drain within
//!   the configured grace period.
//! - TLS listeners are built from PEM files with rustls; HTTP and HTTPS
//!   run side by side when SSL is enabled.
//!
//! Nothing binds a socket until [`Server::listen`] or [`Server::serve`]
//! is called, so a fully configured server is cheap to construct in
//! tests and dispatch requests in-process via [`Server::test_request`].
//!
//! ```
//! use portico_config::AppConfig;
//! use portico_core::NoAssets;
//! use portico_server::Server;
//! use std::sync::Arc;
//!
//! let server = Server::app(AppConfig::development(), Arc::new(NoAssets));
//! assert_eq!(server.middleware().len(), 15);
//! assert!(server.routes().is_empty());
//! ```

mod dispatch;
mod error;
mod graphql;
mod pages;
mod proxy;
mod server;
mod shutdown;
mod tls;

pub use dispatch::ON_UPGRADE_KEY;
pub use error::{ServerError, ServerResult};
pub use graphql::{GraphQlPost, GraphQlWs};
pub use pages::{error_page, not_found_page, playground_page};
pub use proxy::SpaProxy;
pub use server::Server;
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
pub use tls::{build_acceptor, cert_files_exist};
