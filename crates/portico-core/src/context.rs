//! Per-request context.
//!
//! A [`Context`] carries one request through its handler chain. It owns
//! the request data, the response being built, the captured path
//! parameters, a string-keyed store for passing values between handlers,
//! and the chain cursor driven by [`Context::next`] and
//! [`Context::abort`].

use std::any::Any;
use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use http_body_util::Full;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};

use crate::handler::Chain;
use crate::params::Params;

/// Per-request state threaded through a handler chain.
///
/// Handlers receive `&mut Context` and use it for everything: reading
/// the request, writing the response, and controlling chain descent.
///
/// # Chain control
///
/// The chain never advances on its own. A handler that wants the rest of
/// the chain to run calls [`next`](Self::next); one that returns without
/// calling it stops the chain at that point. [`abort`](Self::abort)
/// latches: once called, every later `next` is a no-op, though code
/// after an already-entered `next().await` still runs as the stack
/// unwinds.
///
/// # Response writes
///
/// The first status written wins; later writes are ignored. Body writers
/// append in call order.
pub struct Context {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    params: Params,

    status: StatusCode,
    status_written: bool,
    response_headers: HeaderMap,
    response_body: BytesMut,

    chain: Chain,
    cursor: usize,
    aborted: bool,

    store: HashMap<String, Box<dyn Any + Send>>,
}

impl Context {
    /// Creates a context for a request with an empty chain.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            remote_addr: None,
            params: Params::new(),
            status: StatusCode::OK,
            status_written: false,
            response_headers: HeaderMap::new(),
            response_body: BytesMut::new(),
            chain: Vec::new().into(),
            cursor: 0,
            aborted: false,
            store: HashMap::new(),
        }
    }

    /// Creates a context for `path` bound to `chain`, with no headers or
    /// body. Convenience for dispatch glue and tests.
    #[must_use]
    pub fn for_chain(method: Method, path: &str, chain: Chain) -> Self {
        let uri = Uri::try_from(path).unwrap_or_else(|_| Uri::from_static("/"));
        let mut ctx = Self::new(method, uri, HeaderMap::new(), Bytes::new());
        ctx.chain = chain;
        ctx
    }

    /// Replaces the chain and rewinds the cursor.
    pub fn set_chain(&mut self, chain: Chain) {
        self.chain = chain;
        self.cursor = 0;
        self.aborted = false;
    }

    /// Sets the captured path parameters.
    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    /// Sets the peer address of the underlying connection.
    pub fn set_remote_addr(&mut self, addr: SocketAddr) {
        self.remote_addr = Some(addr);
    }

    // ---- chain control -------------------------------------------------

    /// Runs the chain from the beginning.
    pub async fn run(&mut self) {
        self.next().await;
    }

    /// Invokes the next handler in the chain, if any.
    ///
    /// Advances the cursor by exactly one step. Does nothing when the
    /// chain is exhausted or [`abort`](Self::abort) was called.
    pub async fn next(&mut self) {
        if self.aborted || self.cursor >= self.chain.len() {
            return;
        }
        let index = self.cursor;
        self.cursor += 1;
        let handler = self.chain[index].clone();
        handler.call(self).await;
    }

    /// Prevents any further descent into the chain.
    ///
    /// Handlers above the current one still finish normally after their
    /// `next().await` returns.
    pub fn abort(&mut self) {
        self.aborted = true;
        self.cursor = self.chain.len();
    }

    /// Writes `status` and aborts the chain.
    pub fn abort_with_status(&mut self, status: StatusCode) {
        self.status(status);
        self.abort();
    }

    /// Returns `true` once [`abort`](Self::abort) has been called.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    // ---- request side --------------------------------------------------

    /// The request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The request path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The request headers.
    #[must_use]
    pub fn request_headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A request header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn request_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The raw request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Deserializes the request body as JSON.
    pub fn body_json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// The peer address, when the request came over a real connection.
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// The captured path parameters.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The value captured for path parameter `name`, or `""` when the
    /// route declared no such parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).unwrap_or("")
    }

    /// The first query-string value for `name`, percent-decoded, or `""`
    /// when absent.
    #[must_use]
    pub fn query(&self, name: &str) -> String {
        let Some(query) = self.uri.query() else {
            return String::new();
        };
        for pair in query.split('&') {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next().unwrap_or("");
            if decode_component(key) == name {
                return decode_component(parts.next().unwrap_or(""));
            }
        }
        String::new()
    }

    // ---- store ---------------------------------------------------------

    /// Stores a value under `key` for downstream handlers.
    pub fn set<T: Any + Send>(&mut self, key: impl Into<String>, value: T) {
        self.store.insert(key.into(), Box::new(value));
    }

    /// Borrows a stored value, if present and of type `T`.
    #[must_use]
    pub fn get<T: Any + Send>(&self, key: &str) -> Option<&T> {
        self.store.get(key).and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a stored value, if present and of type `T`.
    pub fn take<T: Any + Send>(&mut self, key: &str) -> Option<T> {
        let value = self.store.remove(key)?;
        match value.downcast::<T>() {
            Ok(boxed) => Some(*boxed),
            Err(other) => {
                // Type mismatch: put it back untouched.
                self.store.insert(key.to_string(), other);
                None
            }
        }
    }

    // ---- response side -------------------------------------------------

    /// Writes the response status. The first write wins; later calls are
    /// ignored.
    pub fn status(&mut self, code: StatusCode) {
        if !self.status_written {
            self.status = code;
            self.status_written = true;
        }
    }

    /// The response status as currently set.
    #[must_use]
    pub fn response_status(&self) -> StatusCode {
        self.status
    }

    /// Whether a status has been explicitly written.
    #[must_use]
    pub fn status_written(&self) -> bool {
        self.status_written
    }

    /// Sets a response header, replacing any existing value.
    pub fn header(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) {
        match parse_header(name.as_ref(), value.as_ref()) {
            Some((name, value)) => {
                self.response_headers.insert(name, value);
            }
            None => warn!(
                name = name.as_ref(),
                "dropping invalid response header"
            ),
        }
    }

    /// Appends a response header, keeping existing values. Used for
    /// headers that legitimately repeat, such as `Set-Cookie`.
    pub fn add_header(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) {
        match parse_header(name.as_ref(), value.as_ref()) {
            Some((name, value)) => {
                self.response_headers.append(name, value);
            }
            None => warn!(
                name = name.as_ref(),
                "dropping invalid response header"
            ),
        }
    }

    /// Removes all values of a response header.
    pub fn remove_header(&mut self, name: &str) {
        if let Ok(name) = HeaderName::try_from(name) {
            self.response_headers.remove(name);
        }
    }

    /// A response header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn response_header(&self, name: &str) -> Option<&str> {
        self.response_headers
            .get(name)
            .and_then(|v| v.to_str().ok())
    }

    /// The response headers.
    #[must_use]
    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    /// Writes a plain-text response.
    pub fn string(&mut self, code: StatusCode, text: impl AsRef<str>) {
        self.content_type_if_absent("text/plain; charset=utf-8");
        self.status(code);
        self.response_body.extend_from_slice(text.as_ref().as_bytes());
    }

    /// Writes an HTML response.
    pub fn html(&mut self, code: StatusCode, html: impl AsRef<str>) {
        self.content_type_if_absent("text/html; charset=utf-8");
        self.status(code);
        self.response_body.extend_from_slice(html.as_ref().as_bytes());
    }

    /// Serializes `value` as a JSON response.
    ///
    /// A serialization failure is logged and turns into a 500 unless a
    /// status was already written.
    pub fn json<T: Serialize>(&mut self, code: StatusCode, value: &T) {
        match serde_json::to_vec(value) {
            Ok(buf) => {
                self.content_type_if_absent("application/json");
                self.status(code);
                self.response_body.extend_from_slice(&buf);
            }
            Err(err) => {
                error!(error = %err, "failed to serialize response body");
                self.status(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
    }

    /// Writes raw bytes with an explicit content type.
    pub fn data(&mut self, code: StatusCode, content_type: &str, body: &[u8]) {
        self.content_type_if_absent(content_type);
        self.status(code);
        self.response_body.extend_from_slice(body);
    }

    /// Appends raw bytes to the response body without touching status or
    /// headers.
    pub fn write_body(&mut self, bytes: &[u8]) {
        self.response_body.extend_from_slice(bytes);
    }

    /// Replaces the entire response body. Used by stages that rewrite
    /// the response, such as compression.
    pub fn replace_body(&mut self, body: &[u8]) {
        self.response_body.clear();
        self.response_body.extend_from_slice(body);
    }

    /// Writes a redirect response.
    pub fn redirect(&mut self, code: StatusCode, location: &str) {
        if let Ok(value) = HeaderValue::try_from(location) {
            self.response_headers.insert(LOCATION, value);
        }
        self.status(code);
    }

    /// The response body accumulated so far.
    #[must_use]
    pub fn response_body(&self) -> &[u8] {
        &self.response_body
    }

    /// Discards the response written so far and starts over.
    ///
    /// Used by the recovery stage after a panic, where the chain may
    /// have written half a response before dying.
    pub fn reset_response(&mut self) {
        self.status = StatusCode::OK;
        self.status_written = false;
        self.response_headers.clear();
        self.response_body.clear();
    }

    /// Consumes the context, producing the HTTP response.
    ///
    /// An untouched context yields `200 OK` with an empty body.
    #[must_use]
    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let mut response = http::Response::new(Full::new(self.response_body.freeze()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.response_headers;
        response
    }

    fn content_type_if_absent(&mut self, content_type: &str) {
        if !self.response_headers.contains_key(CONTENT_TYPE) {
            if let Ok(value) = HeaderValue::try_from(content_type) {
                self.response_headers.insert(CONTENT_TYPE, value);
            }
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("status", &self.status)
            .field("cursor", &self.cursor)
            .field("aborted", &self.aborted)
            .finish_non_exhaustive()
    }
}

fn parse_header(name: &str, value: &str) -> Option<(HeaderName, HeaderValue)> {
    let name = HeaderName::try_from(name).ok()?;
    let value = HeaderValue::try_from(value).ok()?;
    Some((name, value))
}

fn decode_component(raw: &str) -> String {
    let plus_decoded = raw.replace('+', " ");
    match urlencoding::decode(&plus_decoded) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => plus_decoded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{boxed_handler, handler_fn, Chain};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn trace_handler(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> crate::HandlerFunc {
        let log = log.clone();
        boxed_handler(move |ctx: &mut Context| {
            let log = log.clone();
            Box::pin(async move {
                log.lock().unwrap().push(name);
                ctx.next().await;
                log.lock().unwrap().push(name);
            })
        })
    }

    #[tokio::test]
    async fn test_chain_runs_in_order_and_unwinds() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let terminal_log = log.clone();
        let chain: Chain = vec![
            trace_handler(&log, "outer"),
            trace_handler(&log, "inner"),
            boxed_handler(move |ctx: &mut Context| {
                let log = terminal_log.clone();
                Box::pin(async move {
                    log.lock().unwrap().push("handler");
                    ctx.string(StatusCode::OK, "done");
                })
            }),
        ]
        .into();

        let mut ctx = Context::for_chain(Method::GET, "/", chain);
        ctx.run().await;

        assert_eq!(
            *log.lock().unwrap(),
            vec!["outer", "inner", "handler", "inner", "outer"]
        );
        assert_eq!(ctx.response_body(), b"done".as_slice());
    }

    #[tokio::test]
    async fn test_handler_without_next_stops_chain() {
        let reached = Arc::new(AtomicUsize::new(0));
        let counter = reached.clone();
        let chain: Chain = vec![
            boxed_handler(|ctx: &mut Context| {
                Box::pin(async move {
                    ctx.string(StatusCode::OK, "short-circuit");
                    // no call to next(): the chain must stop here
                })
            }),
            boxed_handler(move |_ctx: &mut Context| {
                let counter = counter.clone();
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            }),
        ]
        .into();

        let mut ctx = Context::for_chain(Method::GET, "/", chain);
        ctx.run().await;

        assert_eq!(reached.load(Ordering::SeqCst), 0);
        assert_eq!(ctx.response_body(), b"short-circuit".as_slice());
    }

    #[tokio::test]
    async fn test_abort_latches_and_outer_code_still_runs() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let outer_log = log.clone();
        let abort_log = log.clone();
        let reached = Arc::new(AtomicUsize::new(0));
        let counter = reached.clone();

        let chain: Chain = vec![
            boxed_handler(move |ctx: &mut Context| {
                let log = outer_log.clone();
                Box::pin(async move {
                    log.lock().unwrap().push("before");
                    ctx.next().await;
                    log.lock().unwrap().push("after");
                })
            }),
            boxed_handler(move |ctx: &mut Context| {
                let log = abort_log.clone();
                Box::pin(async move {
                    log.lock().unwrap().push("aborting");
                    ctx.abort_with_status(StatusCode::FORBIDDEN);
                    // next() after abort is a no-op
                    ctx.next().await;
                })
            }),
            boxed_handler(move |_ctx: &mut Context| {
                let counter = counter.clone();
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            }),
        ]
        .into();

        let mut ctx = Context::for_chain(Method::GET, "/", chain);
        ctx.run().await;

        assert!(ctx.is_aborted());
        assert_eq!(ctx.response_status(), StatusCode::FORBIDDEN);
        assert_eq!(reached.load(Ordering::SeqCst), 0);
        assert_eq!(*log.lock().unwrap(), vec!["before", "aborting", "after"]);
    }

    #[tokio::test]
    async fn test_first_status_wins_and_bodies_append() {
        let chain: Chain = vec![handler_fn(write_twice)].into();

        async fn write_twice(ctx: &mut Context) {
            ctx.string(StatusCode::CREATED, "first");
            ctx.string(StatusCode::IM_A_TEAPOT, " second");
        }

        let mut ctx = Context::for_chain(Method::GET, "/", chain);
        ctx.run().await;

        assert_eq!(ctx.response_status(), StatusCode::CREATED);
        assert_eq!(ctx.response_body(), b"first second".as_slice());
    }

    #[test]
    fn test_param_defaults_to_empty() {
        let ctx = Context::new(
            Method::GET,
            Uri::from_static("/users/42"),
            HeaderMap::new(),
            Bytes::new(),
        );
        assert_eq!(ctx.param("id"), "");
    }

    #[test]
    fn test_param_returns_captured_value() {
        let mut ctx = Context::new(
            Method::GET,
            Uri::from_static("/users/42"),
            HeaderMap::new(),
            Bytes::new(),
        );
        let mut params = Params::new();
        params.push("id", "42");
        ctx.set_params(params);
        assert_eq!(ctx.param("id"), "42");
    }

    #[test]
    fn test_query_decoding() {
        let ctx = Context::new(
            Method::GET,
            Uri::from_static("/search?q=hello%20world&page=2&tag=a+b"),
            HeaderMap::new(),
            Bytes::new(),
        );
        assert_eq!(ctx.query("q"), "hello world");
        assert_eq!(ctx.query("page"), "2");
        assert_eq!(ctx.query("tag"), "a b");
        assert_eq!(ctx.query("missing"), "");
    }

    #[test]
    fn test_store_roundtrip() {
        let mut ctx = Context::new(
            Method::GET,
            Uri::from_static("/"),
            HeaderMap::new(),
            Bytes::new(),
        );
        ctx.set("request_id", String::from("abc-123"));

        assert_eq!(
            ctx.get::<String>("request_id").map(String::as_str),
            Some("abc-123")
        );
        // wrong type leaves the value in place
        assert_eq!(ctx.take::<u64>("request_id"), None);
        assert_eq!(ctx.take::<String>("request_id"), Some("abc-123".to_string()));
        assert_eq!(ctx.get::<String>("request_id"), None);
    }

    #[test]
    fn test_untouched_context_is_200_empty() {
        let ctx = Context::new(
            Method::GET,
            Uri::from_static("/"),
            HeaderMap::new(),
            Bytes::new(),
        );
        let response = ctx.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_add_header_keeps_both_values() {
        let mut ctx = Context::new(
            Method::GET,
            Uri::from_static("/"),
            HeaderMap::new(),
            Bytes::new(),
        );
        ctx.add_header("set-cookie", "a=1");
        ctx.add_header("set-cookie", "b=2");
        let values: Vec<_> = ctx
            .response_headers()
            .get_all("set-cookie")
            .iter()
            .collect();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_redirect_sets_location() {
        let mut ctx = Context::new(
            Method::GET,
            Uri::from_static("/old"),
            HeaderMap::new(),
            Bytes::new(),
        );
        ctx.redirect(StatusCode::FOUND, "/new");
        assert_eq!(ctx.response_status(), StatusCode::FOUND);
        assert_eq!(ctx.response_header("location"), Some("/new"));
    }
}
