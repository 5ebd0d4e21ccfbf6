//! Router registration surface and the frozen dispatch table.

use std::sync::Arc;

use http::{Method, StatusCode};
use parking_lot::RwLock;
use portico_core::{handler_fn, Chain, Context, HandlerFunc, Params};

use crate::node::Node;
use crate::route::Route;

/// The routing core: a shared handle over the mutable registration
/// state.
///
/// Registration happens through this handle (usually via
/// [`RouterGroup`](crate::RouterGroup)); dispatch happens against an
/// immutable [`RouteTable`] produced by [`freeze`](Self::freeze), so no
/// lock is ever held while a request runs.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RwLock<RouterInner>>,
}

struct RouterInner {
    root: Node,
    routes: Vec<Route>,
    not_found_prefix: Vec<HandlerFunc>,
    not_found_terminal: Vec<HandlerFunc>,
}

impl Router {
    /// Creates an empty router.
    ///
    /// Unmatched requests answer with a bare 404 until a custom
    /// not-found chain is installed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(RouterInner {
                root: Node::root(),
                routes: Vec::new(),
                not_found_prefix: Vec::new(),
                not_found_terminal: vec![handler_fn(default_not_found)],
            })),
        }
    }

    /// Registers a route.
    ///
    /// The chain must already be fully composed (group middleware plus
    /// route handlers); it is stored as-is and never recomposed.
    ///
    /// # Panics
    ///
    /// Panics on an empty chain, a duplicate method + path registration,
    /// or a malformed pattern.
    pub fn add_route(&self, method: Method, path: &str, chain: Vec<HandlerFunc>) {
        assert!(
            !chain.is_empty(),
            "route {method} {path} must have at least one handler"
        );
        let path = normalize_path(path);
        let mut inner = self.inner.write();
        assert!(
            !inner
                .routes
                .iter()
                .any(|r| r.method() == &method && r.path() == path),
            "duplicate route registration: {method} {path}"
        );
        let chain: Chain = chain.into();
        inner.root.insert(method.clone(), &path, chain.clone());
        inner.routes.push(Route::new(method, path, chain));
    }

    /// All registered routes in registration order.
    #[must_use]
    pub fn routes(&self) -> Vec<Route> {
        self.inner.read().routes.clone()
    }

    /// Number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.inner.read().routes.len()
    }

    /// Replaces the middleware that runs in front of the not-found
    /// handler. Called by the root group whenever its middleware list
    /// changes, so 404s see the same global middleware as routes.
    pub fn set_not_found_prefix(&self, handlers: Vec<HandlerFunc>) {
        self.inner.write().not_found_prefix = handlers;
    }

    /// Replaces the terminal not-found handlers.
    pub fn set_not_found_terminal(&self, handlers: Vec<HandlerFunc>) {
        assert!(
            !handlers.is_empty(),
            "not-found chain must have at least one handler"
        );
        self.inner.write().not_found_terminal = handlers;
    }

    /// Produces an immutable snapshot for dispatch.
    #[must_use]
    pub fn freeze(&self) -> RouteTable {
        let inner = self.inner.read();
        let not_found: Chain = inner
            .not_found_prefix
            .iter()
            .chain(inner.not_found_terminal.iter())
            .cloned()
            .collect::<Vec<_>>()
            .into();
        RouteTable {
            root: inner.root.clone(),
            routes: inner.routes.clone(),
            not_found,
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.route_count())
            .finish()
    }
}

/// An immutable routing snapshot used to dispatch requests.
#[derive(Clone)]
pub struct RouteTable {
    root: Node,
    routes: Vec<Route>,
    not_found: Chain,
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("root", &self.root)
            .field("routes", &self.routes)
            .field("not_found_len", &self.not_found.len())
            .finish()
    }
}

impl RouteTable {
    /// Looks up the chain for a request.
    #[must_use]
    pub fn find(&self, method: &Method, path: &str) -> Option<(Chain, Params)> {
        let (chain, captures) = self.root.find(method, path)?;
        Some((chain, captures.into_iter().collect()))
    }

    /// The chain that serves unmatched requests.
    #[must_use]
    pub fn not_found(&self) -> &Chain {
        &self.not_found
    }

    /// The routes this table was frozen with.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

/// The stock not-found handler: a bare 404.
async fn default_not_found(ctx: &mut Context) {
    ctx.status(StatusCode::NOT_FOUND);
}

/// Normalizes a path for registration and comparison: leading slash
/// added, trailing slashes removed, `/` itself left alone.
pub(crate) fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> HandlerFunc {
        async fn handler(_ctx: &mut Context) {}
        handler_fn(handler)
    }

    fn ok_handler(body: &'static str) -> HandlerFunc {
        portico_core::boxed_handler(move |ctx: &mut Context| {
            Box::pin(async move {
                ctx.string(StatusCode::OK, body);
            })
        })
    }

    #[test]
    fn test_add_and_find() {
        let router = Router::new();
        router.add_route(Method::GET, "/users/:id", vec![noop()]);

        let table = router.freeze();
        let (chain, params) = table.find(&Method::GET, "/users/7").unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(params.get("id"), Some("7"));
    }

    #[test]
    fn test_trailing_slash_normalization() {
        let router = Router::new();
        router.add_route(Method::GET, "/users/", vec![noop()]);

        let table = router.freeze();
        assert!(table.find(&Method::GET, "/users").is_some());
        assert!(table.find(&Method::GET, "/users/").is_some());
        assert_eq!(router.routes()[0].path(), "/users");
    }

    #[test]
    fn test_routes_keep_registration_order() {
        let router = Router::new();
        router.add_route(Method::GET, "/b", vec![noop()]);
        router.add_route(Method::GET, "/a", vec![noop()]);
        router.add_route(Method::POST, "/a", vec![noop()]);

        let routes = router.routes();
        assert_eq!(routes.len(), 3);
        assert_eq!(routes[0].path(), "/b");
        assert_eq!(routes[1].path(), "/a");
        assert_eq!(routes[2].method(), &Method::POST);
    }

    #[test]
    #[should_panic(expected = "duplicate route registration")]
    fn test_duplicate_route_panics() {
        let router = Router::new();
        router.add_route(Method::GET, "/users", vec![noop()]);
        router.add_route(Method::GET, "/users/", vec![noop()]);
    }

    #[test]
    #[should_panic(expected = "must have at least one handler")]
    fn test_empty_chain_panics() {
        let router = Router::new();
        router.add_route(Method::GET, "/users", vec![]);
    }

    #[test]
    fn test_same_path_different_methods_allowed() {
        let router = Router::new();
        router.add_route(Method::GET, "/users", vec![noop()]);
        router.add_route(Method::POST, "/users", vec![noop()]);
        assert_eq!(router.route_count(), 2);
    }

    #[tokio::test]
    async fn test_default_not_found_is_bare_404() {
        let router = Router::new();
        let table = router.freeze();

        let mut ctx = Context::for_chain(Method::GET, "/missing", table.not_found().clone());
        ctx.run().await;
        assert_eq!(ctx.response_status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_custom_not_found_terminal() {
        let router = Router::new();
        router.set_not_found_terminal(vec![ok_handler("custom miss")]);

        let table = router.freeze();
        let mut ctx = Context::for_chain(Method::GET, "/missing", table.not_found().clone());
        ctx.run().await;
        assert_eq!(ctx.response_body(), b"custom miss".as_slice());
    }

    #[test]
    fn test_not_found_prefix_grows_chain() {
        let router = Router::new();
        assert_eq!(router.freeze().not_found().len(), 1);

        router.set_not_found_prefix(vec![noop(), noop()]);
        assert_eq!(router.freeze().not_found().len(), 3);
    }

    #[test]
    fn test_freeze_is_a_snapshot() {
        let router = Router::new();
        router.add_route(Method::GET, "/a", vec![noop()]);

        let table = router.freeze();
        router.add_route(Method::GET, "/b", vec![noop()]);

        assert!(table.find(&Method::GET, "/b").is_none());
        assert_eq!(table.routes().len(), 1);
        assert!(router.freeze().find(&Method::GET, "/b").is_some());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/a/"), "/a");
        assert_eq!(normalize_path("a/b"), "/a/b");
    }
}
