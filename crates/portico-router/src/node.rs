//! Radix tree node implementation.
//!
//! The routing tree is a compressed trie over path segments. Each node
//! holds per-method handler chains; matching walks the tree segment by
//! segment with full backtracking so that static segments always beat
//! parameters, and parameters always beat wildcards.

use http::Method;
use portico_core::Chain;

use crate::route::MethodChains;

/// Kind of a path segment in the routing tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Literal path segment (e.g. `users`, `api`).
    Static,
    /// Named parameter (e.g. `:id`), capturing exactly one segment.
    Param(String),
    /// Catch-all wildcard (e.g. `*filepath`), capturing the joined
    /// remainder of the path. Must be the final segment.
    Wildcard(String),
}

/// A node in the routing tree.
///
/// Static children are kept sorted by segment for binary search; a node
/// has at most one parameter child and at most one wildcard child.
#[derive(Debug, Clone)]
pub struct Node {
    /// The segment label as written in the route pattern.
    pub segment: String,
    /// The kind of segment.
    pub kind: SegmentKind,
    /// Handler chains registered at this node, keyed by method.
    pub chains: Option<MethodChains>,
    /// Static children, sorted by segment.
    pub static_children: Vec<Node>,
    /// Parameter child, at most one per node.
    pub param_child: Option<Box<Node>>,
    /// Wildcard child, at most one per node, always a leaf.
    pub wildcard_child: Option<Box<Node>>,
}

impl Node {
    /// Creates a static node.
    #[must_use]
    pub fn new_static(segment: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            kind: SegmentKind::Static,
            chains: None,
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    /// Creates a parameter node.
    #[must_use]
    pub fn new_param(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            segment: format!(":{name}"),
            kind: SegmentKind::Param(name),
            chains: None,
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    /// Creates a wildcard node.
    #[must_use]
    pub fn new_wildcard(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            segment: format!("*{name}"),
            kind: SegmentKind::Wildcard(name),
            chains: None,
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    /// Creates the root node of a tree.
    #[must_use]
    pub fn root() -> Self {
        Self::new_static("")
    }

    /// Inserts a route pattern with its handler chain.
    ///
    /// # Panics
    ///
    /// Panics when the pattern is malformed: a wildcard that is not the
    /// final segment, a parameter or wildcard without a name, or a
    /// parameter name that conflicts with one already registered at the
    /// same position.
    pub fn insert(&mut self, method: Method, path: &str, chain: Chain) {
        let segments = Self::parse_path(path);
        self.insert_segments(&segments, method, chain);
    }

    /// Parses a path pattern into segments.
    fn parse_path(path: &str) -> Vec<(String, SegmentKind)> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if let Some(name) = s.strip_prefix(':') {
                    assert!(!name.is_empty(), "parameter segment must have a name");
                    (s.to_string(), SegmentKind::Param(name.to_string()))
                } else if let Some(name) = s.strip_prefix('*') {
                    assert!(!name.is_empty(), "wildcard segment must have a name");
                    (s.to_string(), SegmentKind::Wildcard(name.to_string()))
                } else {
                    (s.to_string(), SegmentKind::Static)
                }
            })
            .collect()
    }

    fn insert_segments(&mut self, segments: &[(String, SegmentKind)], method: Method, chain: Chain) {
        if segments.is_empty() {
            self.chains
                .get_or_insert_with(MethodChains::new)
                .insert(method, chain);
            return;
        }

        let (segment, kind) = &segments[0];
        let remaining = &segments[1..];

        match kind {
            SegmentKind::Static => {
                if let Some(child) = self
                    .static_children
                    .iter_mut()
                    .find(|c| c.segment == *segment)
                {
                    child.insert_segments(remaining, method, chain);
                } else {
                    let mut child = Node::new_static(segment);
                    child.insert_segments(remaining, method, chain);
                    self.static_children.push(child);
                    // Keep sorted for binary search
                    self.static_children
                        .sort_by(|a, b| a.segment.cmp(&b.segment));
                }
            }
            SegmentKind::Param(name) => {
                if let Some(child) = &self.param_child {
                    assert!(
                        child.kind == SegmentKind::Param(name.clone()),
                        "conflicting parameter names at one position: {} vs :{name}",
                        child.segment
                    );
                } else {
                    self.param_child = Some(Box::new(Node::new_param(name)));
                }
                if let Some(child) = &mut self.param_child {
                    child.insert_segments(remaining, method, chain);
                }
            }
            SegmentKind::Wildcard(name) => {
                assert!(
                    remaining.is_empty(),
                    "wildcard must be the last segment in path"
                );
                if let Some(child) = &self.wildcard_child {
                    assert!(
                        child.kind == SegmentKind::Wildcard(name.clone()),
                        "conflicting wildcard names at one position: {} vs *{name}",
                        child.segment
                    );
                } else {
                    self.wildcard_child = Some(Box::new(Node::new_wildcard(name)));
                }
                if let Some(child) = &mut self.wildcard_child {
                    child
                        .chains
                        .get_or_insert_with(MethodChains::new)
                        .insert(method, chain);
                }
            }
        }
    }

    /// Matches a path against the tree for a method.
    ///
    /// Returns the handler chain and the captured parameters on a hit.
    #[must_use]
    pub fn find(&self, method: &Method, path: &str) -> Option<(Chain, Vec<(String, String)>)> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut captures = Vec::new();
        let chain = self.match_segments(method, &segments, &mut captures)?;
        Some((chain.clone(), captures))
    }

    fn match_segments<'a>(
        &'a self,
        method: &Method,
        segments: &[&str],
        captures: &mut Vec<(String, String)>,
    ) -> Option<&'a Chain> {
        if segments.is_empty() {
            if let Some(chain) = self.chains.as_ref().and_then(|c| c.get(method)) {
                return Some(chain);
            }
            // An exhausted path can still satisfy a wildcard child,
            // which then captures the empty string.
            if let Some(child) = &self.wildcard_child {
                if let SegmentKind::Wildcard(name) = &child.kind {
                    if let Some(chain) = child.chains.as_ref().and_then(|c| c.get(method)) {
                        captures.push((name.clone(), String::new()));
                        return Some(chain);
                    }
                }
            }
            return None;
        }

        let segment = segments[0];
        let remaining = &segments[1..];

        // Static match first (highest priority). On a dead end deeper in
        // the tree, fall through and retry as a parameter.
        if let Some(child) = self.find_static_child(segment) {
            let saved = captures.len();
            if let Some(chain) = child.match_segments(method, remaining, captures) {
                return Some(chain);
            }
            captures.truncate(saved);
        }

        // Parameter match
        if let Some(child) = &self.param_child {
            if let SegmentKind::Param(name) = &child.kind {
                let saved = captures.len();
                captures.push((name.clone(), segment.to_string()));
                if let Some(chain) = child.match_segments(method, remaining, captures) {
                    return Some(chain);
                }
                captures.truncate(saved);
            }
        }

        // Wildcard match (lowest priority, consumes the remainder)
        if let Some(child) = &self.wildcard_child {
            if let SegmentKind::Wildcard(name) = &child.kind {
                if let Some(chain) = child.chains.as_ref().and_then(|c| c.get(method)) {
                    captures.push((name.clone(), segments.join("/")));
                    return Some(chain);
                }
            }
        }

        None
    }

    /// Finds a static child by segment using binary search.
    fn find_static_child(&self, segment: &str) -> Option<&Node> {
        self.static_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
            .ok()
            .map(|i| &self.static_children[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_core::{handler_fn, Context};

    fn noop_chain() -> Chain {
        async fn noop(_ctx: &mut Context) {}
        vec![handler_fn(noop)].into()
    }

    #[test]
    fn test_node_new_param() {
        let node = Node::new_param("id");
        assert_eq!(node.segment, ":id");
        assert_eq!(node.kind, SegmentKind::Param("id".to_string()));
    }

    #[test]
    fn test_node_new_wildcard() {
        let node = Node::new_wildcard("path");
        assert_eq!(node.segment, "*path");
        assert_eq!(node.kind, SegmentKind::Wildcard("path".to_string()));
    }

    #[test]
    fn test_parse_path_kinds() {
        let segments = Node::parse_path("/users/:id/files/*path");
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0], ("users".to_string(), SegmentKind::Static));
        assert_eq!(
            segments[1],
            (":id".to_string(), SegmentKind::Param("id".to_string()))
        );
        assert_eq!(segments[2], ("files".to_string(), SegmentKind::Static));
        assert_eq!(
            segments[3],
            ("*path".to_string(), SegmentKind::Wildcard("path".to_string()))
        );
    }

    #[test]
    fn test_insert_and_find_static() {
        let mut root = Node::root();
        root.insert(Method::GET, "/users", noop_chain());

        let (_, params) = root.find(&Method::GET, "/users").unwrap();
        assert!(params.is_empty());
        assert!(root.find(&Method::POST, "/users").is_none());
    }

    #[test]
    fn test_insert_and_find_param() {
        let mut root = Node::root();
        root.insert(Method::GET, "/users/:id", noop_chain());

        let (_, params) = root.find(&Method::GET, "/users/123").unwrap();
        assert_eq!(params, vec![("id".to_string(), "123".to_string())]);
    }

    #[test]
    fn test_insert_and_find_wildcard() {
        let mut root = Node::root();
        root.insert(Method::GET, "/files/*path", noop_chain());

        let (_, params) = root.find(&Method::GET, "/files/images/logo.png").unwrap();
        assert_eq!(
            params,
            vec![("path".to_string(), "images/logo.png".to_string())]
        );
    }

    #[test]
    fn test_wildcard_matches_empty_remainder() {
        let mut root = Node::root();
        root.insert(Method::GET, "/files/*path", noop_chain());

        let (_, params) = root.find(&Method::GET, "/files").unwrap();
        assert_eq!(params, vec![("path".to_string(), String::new())]);
    }

    #[test]
    fn test_static_priority_over_param() {
        let mut root = Node::root();
        root.insert(Method::GET, "/users/me", noop_chain());
        root.insert(Method::GET, "/users/:id", noop_chain());

        let (_, params) = root.find(&Method::GET, "/users/me").unwrap();
        assert!(params.is_empty());

        let (_, params) = root.find(&Method::GET, "/users/123").unwrap();
        assert_eq!(params, vec![("id".to_string(), "123".to_string())]);
    }

    #[test]
    fn test_param_priority_over_wildcard() {
        let mut root = Node::root();
        root.insert(Method::GET, "/files/:name", noop_chain());
        root.insert(Method::GET, "/files/*rest", noop_chain());

        let (_, params) = root.find(&Method::GET, "/files/a").unwrap();
        assert_eq!(params, vec![("name".to_string(), "a".to_string())]);

        let (_, params) = root.find(&Method::GET, "/files/a/b").unwrap();
        assert_eq!(params, vec![("rest".to_string(), "a/b".to_string())]);
    }

    #[test]
    fn test_backtracks_from_static_dead_end() {
        let mut root = Node::root();
        root.insert(Method::GET, "/a/b/c", noop_chain());
        root.insert(Method::GET, "/a/:x/d", noop_chain());

        // "b" enters the static branch, which lacks "d"; matching must
        // back out and retry "b" as the parameter.
        let (_, params) = root.find(&Method::GET, "/a/b/d").unwrap();
        assert_eq!(params, vec![("x".to_string(), "b".to_string())]);
    }

    #[test]
    fn test_method_miss_falls_back_to_param_route() {
        let mut root = Node::root();
        root.insert(Method::GET, "/x", noop_chain());
        root.insert(Method::POST, "/:p", noop_chain());

        let (_, params) = root.find(&Method::POST, "/x").unwrap();
        assert_eq!(params, vec![("p".to_string(), "x".to_string())]);
    }

    #[test]
    fn test_multiple_params() {
        let mut root = Node::root();
        root.insert(Method::GET, "/orgs/:org/users/:user", noop_chain());

        let (_, params) = root.find(&Method::GET, "/orgs/acme/users/123").unwrap();
        assert_eq!(
            params,
            vec![
                ("org".to_string(), "acme".to_string()),
                ("user".to_string(), "123".to_string())
            ]
        );
    }

    #[test]
    fn test_no_match() {
        let mut root = Node::root();
        root.insert(Method::GET, "/users", noop_chain());
        assert!(root.find(&Method::GET, "/posts").is_none());
    }

    #[test]
    #[should_panic(expected = "wildcard must be the last segment")]
    fn test_wildcard_not_last_panics() {
        let mut root = Node::root();
        root.insert(Method::GET, "/files/*path/extra", noop_chain());
    }

    #[test]
    #[should_panic(expected = "parameter segment must have a name")]
    fn test_unnamed_param_panics() {
        let mut root = Node::root();
        root.insert(Method::GET, "/users/:", noop_chain());
    }

    #[test]
    #[should_panic(expected = "conflicting parameter names")]
    fn test_conflicting_param_names_panic() {
        let mut root = Node::root();
        root.insert(Method::GET, "/users/:id", noop_chain());
        root.insert(Method::POST, "/users/:user_id", noop_chain());
    }
}
