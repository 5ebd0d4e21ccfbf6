//! Route records and per-method chain storage.

use http::Method;
use portico_core::{Chain, HandlerFunc};

/// Handler chains registered at one tree node, keyed by HTTP method.
///
/// One slot per supported method. Registration through
/// [`Router`](crate::Router) rejects duplicates before a slot is ever
/// written twice.
#[derive(Clone, Default)]
pub struct MethodChains {
    get: Option<Chain>,
    post: Option<Chain>,
    put: Option<Chain>,
    patch: Option<Chain>,
    delete: Option<Chain>,
    head: Option<Chain>,
    options: Option<Chain>,
    connect: Option<Chain>,
    trace: Option<Chain>,
}

impl MethodChains {
    /// Creates an empty set of chains.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the chain for `method`, replacing any existing one.
    ///
    /// # Panics
    ///
    /// Panics on a method outside the nine supported verbs.
    pub fn insert(&mut self, method: Method, chain: Chain) {
        let slot = self
            .slot_mut(&method)
            .unwrap_or_else(|| panic!("unsupported HTTP method: {method}"));
        *slot = Some(chain);
    }

    /// The chain registered for `method`, if any.
    #[must_use]
    pub fn get(&self, method: &Method) -> Option<&Chain> {
        self.slot(method).and_then(Option::as_ref)
    }

    /// Returns `true` when no method has a chain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots().iter().all(|s| s.is_none())
    }

    fn slot(&self, method: &Method) -> Option<&Option<Chain>> {
        if *method == Method::GET {
            Some(&self.get)
        } else if *method == Method::POST {
            Some(&self.post)
        } else if *method == Method::PUT {
            Some(&self.put)
        } else if *method == Method::PATCH {
            Some(&self.patch)
        } else if *method == Method::DELETE {
            Some(&self.delete)
        } else if *method == Method::HEAD {
            Some(&self.head)
        } else if *method == Method::OPTIONS {
            Some(&self.options)
        } else if *method == Method::CONNECT {
            Some(&self.connect)
        } else if *method == Method::TRACE {
            Some(&self.trace)
        } else {
            None
        }
    }

    fn slot_mut(&mut self, method: &Method) -> Option<&mut Option<Chain>> {
        if *method == Method::GET {
            Some(&mut self.get)
        } else if *method == Method::POST {
            Some(&mut self.post)
        } else if *method == Method::PUT {
            Some(&mut self.put)
        } else if *method == Method::PATCH {
            Some(&mut self.patch)
        } else if *method == Method::DELETE {
            Some(&mut self.delete)
        } else if *method == Method::HEAD {
            Some(&mut self.head)
        } else if *method == Method::OPTIONS {
            Some(&mut self.options)
        } else if *method == Method::CONNECT {
            Some(&mut self.connect)
        } else if *method == Method::TRACE {
            Some(&mut self.trace)
        } else {
            None
        }
    }

    fn slots(&self) -> [&Option<Chain>; 9] {
        [
            &self.get,
            &self.post,
            &self.put,
            &self.patch,
            &self.delete,
            &self.head,
            &self.options,
            &self.connect,
            &self.trace,
        ]
    }

    fn registered(&self) -> Vec<&'static str> {
        let names = [
            "GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "CONNECT", "TRACE",
        ];
        self.slots()
            .iter()
            .zip(names)
            .filter_map(|(slot, name)| slot.is_some().then_some(name))
            .collect()
    }
}

impl std::fmt::Debug for MethodChains {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodChains")
            .field("methods", &self.registered())
            .finish()
    }
}

/// A registered route: method, pattern, and the composed handler chain.
///
/// Routes are recorded in registration order and returned by
/// [`Router::routes`](crate::Router::routes) for introspection.
#[derive(Clone)]
pub struct Route {
    method: Method,
    path: String,
    chain: Chain,
}

impl Route {
    pub(crate) fn new(method: Method, path: impl Into<String>, chain: Chain) -> Self {
        Self {
            method,
            path: path.into(),
            chain,
        }
    }

    /// The HTTP method this route answers.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The registered path pattern.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The full handler chain, middleware included.
    #[must_use]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// The terminal handler, i.e. the last element of the chain.
    #[must_use]
    pub fn handler(&self) -> Option<&HandlerFunc> {
        self.chain.last()
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("chain_len", &self.chain.len())
            .finish()
    }
}
