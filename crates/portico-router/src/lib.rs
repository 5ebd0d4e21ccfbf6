//! Radix tree routing for the Portico web framework.
//!
//! Routes are registered through [`RouterGroup`]s, which scope a path
//! prefix and a middleware list; each registration composes its full
//! handler chain immediately (group snapshot + route handlers) and
//! stores it in a radix tree keyed by method.
//!
//! Patterns use `:name` for single-segment parameters and `*name` for a
//! trailing catch-all. Matching prefers literal segments over
//! parameters and parameters over wildcards, backtracking as needed.
//!
//! Dispatch never touches registration state: [`Router::freeze`]
//! produces an immutable [`RouteTable`] snapshot that performs lookups
//! without locking.
//!
//! ```
//! use http::Method;
//! use portico_core::{handler_fn, Context};
//! use portico_router::{Router, RouterGroup};
//!
//! async fn show_user(ctx: &mut Context) {
//!     let id = ctx.param("id").to_string();
//!     ctx.string(http::StatusCode::OK, id);
//! }
//!
//! let router = Router::new();
//! let root = RouterGroup::root(&router);
//! root.get("/users/:id", &[handler_fn(show_user)]);
//!
//! let table = router.freeze();
//! let (chain, params) = table.find(&Method::GET, "/users/42").unwrap();
//! assert_eq!(params.get("id"), Some("42"));
//! assert_eq!(chain.len(), 1);
//! ```

pub mod group;
pub mod node;
pub mod route;
pub mod router;

pub use group::{RouterGroup, ANY_METHODS};
pub use node::{Node, SegmentKind};
pub use route::{MethodChains, Route};
pub use router::{RouteTable, Router};
