//! The application server.
//!
//! [`Server`] owns the router, mounts the built-in endpoints (SPA
//! proxy, GraphQL, playground), and runs the accept loops with
//! graceful shutdown. Construction is cheap; nothing binds until
//! [`Server::listen`] or [`Server::serve`] is called.

use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_graphql::Executor;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Response, StatusCode, Uri};
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use portico_config::{AppConfig, GqlConfig, SpaConfig};
use portico_core::{boxed_handler, handler_fn, AssetReader, Context, HandlerFunc};
use portico_middleware::default_stack;
use portico_router::{Route, RouteTable, Router, RouterGroup};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

use crate::dispatch;
use crate::error::{ServerError, ServerResult};
use crate::graphql::{GraphQlPost, GraphQlWs};
use crate::pages;
use crate::proxy::SpaProxy;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};
use crate::tls;

/// Shared state the accept loops hand to every connection task.
struct ServerState {
    table: RouteTable,
    body_timeout: Duration,
    grace: Duration,
}

/// HTTP application server with routing, middleware, and dual
/// HTTP/HTTPS listeners.
///
/// ```
/// use portico_config::AppConfig;
/// use portico_core::NoAssets;
/// use portico_server::Server;
/// use std::sync::Arc;
///
/// let server = Server::app(AppConfig::development(), Arc::new(NoAssets));
/// assert_eq!(server.middleware().len(), 15);
/// ```
pub struct Server {
    config: Arc<AppConfig>,
    assets: Arc<dyn AssetReader>,
    router: Router,
    root: RouterGroup,
    middleware_names: Vec<String>,
}

async fn not_found_handler(ctx: &mut Context) {
    ctx.html(StatusCode::NOT_FOUND, pages::not_found_page());
}

impl Server {
    /// Creates a bare server with no middleware registered.
    ///
    /// Unmatched paths render the built-in 404 page.
    #[must_use]
    pub fn new(config: AppConfig, assets: Arc<dyn AssetReader>) -> Self {
        let router = Router::new();
        router.set_not_found_terminal(vec![handler_fn(not_found_handler)]);
        let root = RouterGroup::root(&router);
        Self {
            config: Arc::new(config),
            assets,
            router,
            root,
            middleware_names: Vec::new(),
        }
    }

    /// Creates a server with the full default middleware stack.
    #[must_use]
    pub fn app(config: AppConfig, assets: Arc<dyn AssetReader>) -> Self {
        let mut server = Self::new(config, assets);
        let stack = default_stack(&server.config, Arc::clone(&server.assets));
        let mut handlers = Vec::with_capacity(stack.len());
        for (name, handler) in stack {
            server.middleware_names.push(name.to_owned());
            handlers.push(handler);
        }
        server.root.use_middleware(&handlers);
        server
    }

    /// The server configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The underlying router.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// The asset reader the server was constructed with.
    #[must_use]
    pub fn assets(&self) -> &Arc<dyn AssetReader> {
        &self.assets
    }

    /// The path prefix of the root routing group.
    #[must_use]
    pub fn base_path(&self) -> &str {
        self.root.prefix()
    }

    /// Names of the registered global middleware, in order.
    #[must_use]
    pub fn middleware(&self) -> &[String] {
        &self.middleware_names
    }

    /// All registered routes in registration order.
    #[must_use]
    pub fn routes(&self) -> Vec<Route> {
        self.router.routes()
    }

    /// Appends global middleware.
    ///
    /// Routes registered before or after this call both run the new
    /// stages; the not-found chain is rebuilt as well.
    pub fn use_middleware(&mut self, handlers: &[HandlerFunc]) {
        for _ in handlers {
            self.middleware_names.push("custom".to_owned());
        }
        self.root.use_middleware(handlers);
    }

    /// Replaces the terminal not-found handlers.
    pub fn no_route(&self, handlers: &[HandlerFunc]) {
        self.router.set_not_found_terminal(handlers.to_vec());
    }

    /// Registers a route for an explicit method.
    pub fn handle(&self, method: Method, path: &str, handlers: &[HandlerFunc]) {
        self.root.handle(method, path, handlers);
    }

    /// Registers a GET route.
    pub fn get(&self, path: &str, handlers: &[HandlerFunc]) {
        self.root.get(path, handlers);
    }

    /// Registers a POST route.
    pub fn post(&self, path: &str, handlers: &[HandlerFunc]) {
        self.root.post(path, handlers);
    }

    /// Registers a PUT route.
    pub fn put(&self, path: &str, handlers: &[HandlerFunc]) {
        self.root.put(path, handlers);
    }

    /// Registers a PATCH route.
    pub fn patch(&self, path: &str, handlers: &[HandlerFunc]) {
        self.root.patch(path, handlers);
    }

    /// Registers a DELETE route.
    pub fn delete(&self, path: &str, handlers: &[HandlerFunc]) {
        self.root.delete(path, handlers);
    }

    /// Registers a HEAD route.
    pub fn head(&self, path: &str, handlers: &[HandlerFunc]) {
        self.root.head(path, handlers);
    }

    /// Registers an OPTIONS route.
    pub fn options(&self, path: &str, handlers: &[HandlerFunc]) {
        self.root.options(path, handlers);
    }

    /// Registers a CONNECT route.
    pub fn connect(&self, path: &str, handlers: &[HandlerFunc]) {
        self.root.connect(path, handlers);
    }

    /// Registers a TRACE route.
    pub fn trace(&self, path: &str, handlers: &[HandlerFunc]) {
        self.root.trace(path, handlers);
    }

    /// Registers the same chain under every supported method.
    pub fn any(&self, path: &str, handlers: &[HandlerFunc]) {
        self.root.any(path, handlers);
    }

    /// Creates a sub-group with an extra prefix and optional middleware.
    #[must_use]
    pub fn group(&self, prefix: &str, handlers: &[HandlerFunc]) -> RouterGroup {
        self.root.group(prefix, handlers)
    }

    /// Startup banner lines, one string per line.
    #[must_use]
    pub fn info(&self) -> Vec<String> {
        let build = if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        };
        let banner = format!(
            "* portico {} ({} {}), build: {}, environment: {}, config: {}",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH,
            build,
            self.config.environment,
            self.config.config_path,
        );

        let mut listening = format!(
            "* Listening on http://{}:{}",
            self.config.http.host, self.config.http.port
        );
        if self.config.http.ssl_enabled {
            listening.push_str(&format!(
                ", https://{}:{}",
                self.config.http.host, self.config.http.ssl_port
            ));
        }

        vec![banner, listening]
    }

    /// Returns true when both the configured certificate and key files
    /// exist on disk.
    #[must_use]
    pub fn ssl_cert_exists(&self) -> bool {
        tls::cert_files_exist(
            Path::new(&self.config.http.ssl_cert_path),
            Path::new(&self.config.http.ssl_key_path),
        )
    }

    /// Mounts a reverse proxy for a single-page app under `prefix`.
    ///
    /// Registers `GET prefix` and `GET prefix/*filepath`. `None` falls
    /// back to the `[spa]` config section.
    ///
    /// # Errors
    ///
    /// Returns an error when the proxy client cannot be constructed.
    pub fn serve_spa(&self, prefix: &str, config: Option<SpaConfig>) -> ServerResult<()> {
        let spa_config = config.unwrap_or_else(|| self.config.spa.clone());
        let proxy: HandlerFunc = Arc::new(SpaProxy::new(&spa_config)?);

        self.root.get(prefix, &[Arc::clone(&proxy)]);
        let wildcard = format!("{}/*filepath", prefix.trim_end_matches('/'));
        self.root.get(&wildcard, &[proxy]);
        Ok(())
    }

    /// Mounts a GraphQL endpoint at `path`.
    ///
    /// `POST path` executes queries and mutations, `GET path` upgrades
    /// to a `graphql-transport-ws` subscription session, and the
    /// playground page is served at the configured playground path
    /// unless disabled. `None` falls back to the `[gql]` config section.
    pub fn setup_graphql<E>(&self, path: &str, executor: E, config: Option<GqlConfig>)
    where
        E: Executor,
    {
        let gql_config = config.unwrap_or_else(|| self.config.gql.clone());

        let post: HandlerFunc = Arc::new(GraphQlPost::new(executor.clone()));
        self.root.post(path, &[post]);

        let ws: HandlerFunc = Arc::new(GraphQlWs::new(executor));
        self.root.get(path, &[ws]);

        if gql_config.playground_enabled {
            let page = pages::playground_page(path);
            let playground = boxed_handler(move |ctx| {
                let page = page.clone();
                Box::pin(async move {
                    ctx.html(StatusCode::OK, page);
                })
            });
            self.root.get(&gql_config.playground_path, &[playground]);
        }
    }

    /// Runs the server until SIGINT or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error when a listener cannot be bound or, with SSL
    /// enabled, the certificate files are missing or invalid.
    pub async fn listen(&self) -> ServerResult<()> {
        self.listen_with_shutdown(ShutdownSignal::with_os_signals())
            .await
    }

    /// Runs the server until `shutdown` triggers.
    ///
    /// With SSL enabled the certificate files are checked before any
    /// socket is bound, so a misconfigured server fails fast.
    ///
    /// # Errors
    ///
    /// Returns an error when a listener cannot be bound or the TLS
    /// acceptor cannot be built.
    pub async fn listen_with_shutdown(&self, shutdown: ShutdownSignal) -> ServerResult<()> {
        let acceptor = if self.config.http.ssl_enabled {
            let cert = Path::new(&self.config.http.ssl_cert_path);
            let key = Path::new(&self.config.http.ssl_key_path);
            if !tls::cert_files_exist(cert, key) {
                return Err(ServerError::missing_certificate(
                    self.config.http.ssl_cert_path.clone(),
                    self.config.http.ssl_key_path.clone(),
                ));
            }
            Some(tls::build_acceptor(cert, key)?)
        } else {
            None
        };

        for line in self.info() {
            tracing::info!("{line}");
        }

        let state = Arc::new(self.freeze_state());

        let http_addr = self.config.http.http_addr();
        let listener = TcpListener::bind(&http_addr)
            .await
            .map_err(|err| ServerError::bind(&http_addr, err))?;

        match acceptor {
            Some(acceptor) => {
                let https_addr = self.config.http.https_addr();
                let tls_listener = TcpListener::bind(&https_addr)
                    .await
                    .map_err(|err| ServerError::bind(&https_addr, err))?;
                tokio::join!(
                    accept_loop(listener, Arc::clone(&state), shutdown.clone(), None),
                    accept_loop(tls_listener, state, shutdown, Some(acceptor)),
                );
            }
            None => accept_loop(listener, state, shutdown, None).await,
        }

        Ok(())
    }

    /// Serves plain HTTP on an already-bound listener until `shutdown`
    /// triggers. Used by tests that need a real port.
    pub async fn serve(&self, listener: TcpListener, shutdown: ShutdownSignal) {
        let state = Arc::new(self.freeze_state());
        accept_loop(listener, state, shutdown, None).await;
    }

    /// Dispatches a request in-process through the full table.
    ///
    /// The router is frozen per call, so routes may keep being
    /// registered between requests.
    pub async fn test_request(
        &self,
        method: Method,
        path: &str,
        headers: &[(&str, &str)],
        body: Bytes,
    ) -> Response<Full<Bytes>> {
        let table = self.router.freeze();

        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            if let (Ok(name), Ok(value)) =
                (HeaderName::try_from(*name), HeaderValue::try_from(*value))
            {
                header_map.append(name, value);
            }
        }
        let uri = Uri::try_from(path).unwrap_or_else(|_| Uri::from_static("/"));

        dispatch::execute(&table, method, uri, header_map, body, None, None).await
    }

    fn freeze_state(&self) -> ServerState {
        ServerState {
            table: self.router.freeze(),
            body_timeout: Duration::from_secs(self.config.http.body_read_timeout_secs),
            grace: Duration::from_secs(self.config.http.shutdown_grace_secs),
        }
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("environment", &self.config.environment)
            .field("routes", &self.router.route_count())
            .field("middleware", &self.middleware_names.len())
            .finish_non_exhaustive()
    }
}

/// Accepts connections until shutdown, then drains in-flight ones.
async fn accept_loop(
    listener: TcpListener,
    state: Arc<ServerState>,
    shutdown: ShutdownSignal,
    acceptor: Option<TlsAcceptor>,
) {
    let tracker = ConnectionTracker::new();
    let grace = state.grace;

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, remote_addr)) => {
                        let state = Arc::clone(&state);
                        let shutdown = shutdown.clone();
                        let acceptor = acceptor.clone();
                        let token = tracker.acquire();

                        tokio::spawn(async move {
                            match acceptor {
                                Some(acceptor) => match acceptor.accept(stream).await {
                                    Ok(stream) => {
                                        handle_connection(stream, state, remote_addr, shutdown)
                                            .await;
                                    }
                                    Err(err) => {
                                        tracing::debug!(
                                            remote_addr = %remote_addr,
                                            error = %err,
                                            "TLS handshake failed"
                                        );
                                    }
                                },
                                None => {
                                    handle_connection(stream, state, remote_addr, shutdown).await;
                                }
                            }
                            drop(token);
                        });
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "failed to accept connection");
                    }
                }
            }

            () = shutdown.recv() => {
                tracing::info!("shutdown signal received, no longer accepting connections");
                break;
            }
        }
    }

    if tracker.active() > 0 {
        tracing::info!(
            active = tracker.active(),
            grace_secs = grace.as_secs(),
            "waiting for in-flight connections"
        );
        tokio::select! {
            () = tracker.wait_for_idle() => {
                tracing::info!("all connections closed");
            }
            () = tokio::time::sleep(grace) => {
                tracing::warn!(
                    active = tracker.active(),
                    "shutdown grace elapsed with connections still active"
                );
            }
        }
    }
}

/// Serves one connection, completing in-flight requests on shutdown.
async fn handle_connection<I>(
    io: I,
    state: Arc<ServerState>,
    remote_addr: SocketAddr,
    shutdown: ShutdownSignal,
) where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = service_fn(move |req| {
        let state = Arc::clone(&state);
        async move {
            Ok::<_, Infallible>(
                dispatch::dispatch(&state.table, req, remote_addr, state.body_timeout).await,
            )
        }
    });

    let connection = http1::Builder::new()
        .serve_connection(TokioIo::new(io), service)
        .with_upgrades();
    let mut connection = std::pin::pin!(connection);

    tokio::select! {
        result = connection.as_mut() => {
            if let Err(err) = result {
                tracing::debug!(remote_addr = %remote_addr, error = %err, "connection error");
            }
        }
        () = shutdown.recv() => {
            connection.as_mut().graceful_shutdown();
            if let Err(err) = connection.await {
                tracing::debug!(remote_addr = %remote_addr, error = %err, "connection error during drain");
            }
        }
    }
}
