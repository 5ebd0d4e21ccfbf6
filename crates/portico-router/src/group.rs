//! Route groups with scoped prefixes and middleware.
//!
//! A [`RouterGroup`] pairs a path prefix with a middleware list. Child
//! groups copy the parent's list at creation time, so later changes to
//! either side never leak across the boundary, and every route's chain
//! is fixed at the moment it is registered.

use http::Method;
use portico_core::HandlerFunc;

use crate::router::Router;

/// The nine methods registered by [`RouterGroup::any`].
pub const ANY_METHODS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
    Method::CONNECT,
    Method::TRACE,
];

/// A registration scope: prefix plus middleware snapshot.
pub struct RouterGroup {
    router: Router,
    prefix: String,
    handlers: Vec<HandlerFunc>,
    is_root: bool,
}

impl RouterGroup {
    /// Creates the root group over `router` with an empty prefix and no
    /// middleware.
    #[must_use]
    pub fn root(router: &Router) -> Self {
        Self {
            router: router.clone(),
            prefix: String::new(),
            handlers: Vec::new(),
            is_root: true,
        }
    }

    /// The accumulated path prefix of this group.
    #[must_use]
    pub fn prefix(&self) -> &str {
        if self.prefix.is_empty() {
            "/"
        } else {
            &self.prefix
        }
    }

    /// Number of middleware handlers currently attached to this group.
    #[must_use]
    pub fn middleware_count(&self) -> usize {
        self.handlers.len()
    }

    /// Creates a child group.
    ///
    /// The child's middleware list starts as a copy of this group's
    /// current list followed by `handlers`. It is a snapshot: middleware
    /// added to the parent afterwards does not reach the child, and vice
    /// versa.
    #[must_use]
    pub fn group(&self, prefix: &str, handlers: &[HandlerFunc]) -> RouterGroup {
        let mut combined = self.handlers.clone();
        combined.extend_from_slice(handlers);
        RouterGroup {
            router: self.router.clone(),
            prefix: join_paths(&self.prefix, prefix),
            handlers: combined,
            is_root: false,
        }
    }

    /// Appends middleware to this group.
    ///
    /// Only routes registered afterwards are affected. On the root
    /// group this also rebuilds the not-found chain, so unmatched
    /// requests pass through the same global middleware.
    pub fn use_middleware(&mut self, handlers: &[HandlerFunc]) {
        self.handlers.extend_from_slice(handlers);
        if self.is_root {
            self.router.set_not_found_prefix(self.handlers.clone());
        }
    }

    /// Registers a route under this group's prefix.
    ///
    /// The stored chain is this group's middleware snapshot followed by
    /// `handlers`; the last element of `handlers` acts as the terminal
    /// handler.
    pub fn handle(&self, method: Method, path: &str, handlers: &[HandlerFunc]) {
        let full_path = join_paths(&self.prefix, path);
        let mut chain = self.handlers.clone();
        chain.extend_from_slice(handlers);
        self.router.add_route(method, &full_path, chain);
    }

    /// Registers a GET route.
    pub fn get(&self, path: &str, handlers: &[HandlerFunc]) {
        self.handle(Method::GET, path, handlers);
    }

    /// Registers a POST route.
    pub fn post(&self, path: &str, handlers: &[HandlerFunc]) {
        self.handle(Method::POST, path, handlers);
    }

    /// Registers a PUT route.
    pub fn put(&self, path: &str, handlers: &[HandlerFunc]) {
        self.handle(Method::PUT, path, handlers);
    }

    /// Registers a PATCH route.
    pub fn patch(&self, path: &str, handlers: &[HandlerFunc]) {
        self.handle(Method::PATCH, path, handlers);
    }

    /// Registers a DELETE route.
    pub fn delete(&self, path: &str, handlers: &[HandlerFunc]) {
        self.handle(Method::DELETE, path, handlers);
    }

    /// Registers a HEAD route.
    pub fn head(&self, path: &str, handlers: &[HandlerFunc]) {
        self.handle(Method::HEAD, path, handlers);
    }

    /// Registers an OPTIONS route.
    pub fn options(&self, path: &str, handlers: &[HandlerFunc]) {
        self.handle(Method::OPTIONS, path, handlers);
    }

    /// Registers a CONNECT route.
    pub fn connect(&self, path: &str, handlers: &[HandlerFunc]) {
        self.handle(Method::CONNECT, path, handlers);
    }

    /// Registers a TRACE route.
    pub fn trace(&self, path: &str, handlers: &[HandlerFunc]) {
        self.handle(Method::TRACE, path, handlers);
    }

    /// Registers the same handlers for all nine methods.
    pub fn any(&self, path: &str, handlers: &[HandlerFunc]) {
        for method in ANY_METHODS {
            self.handle(method, path, handlers);
        }
    }
}

impl std::fmt::Debug for RouterGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterGroup")
            .field("prefix", &self.prefix())
            .field("middleware", &self.handlers.len())
            .field("is_root", &self.is_root)
            .finish()
    }
}

/// Joins a group prefix with a route path, normalizing slashes.
fn join_paths(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        if base.is_empty() {
            "/".to_string()
        } else {
            base.to_string()
        }
    } else {
        format!("{base}/{path}")
    }
}
