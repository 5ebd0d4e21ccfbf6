//! Request dispatch from the wire into the frozen routing table.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, Method, Response, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::upgrade::OnUpgrade;
use portico_core::{Context, Params};
use portico_router::RouteTable;

/// Context store key under which a pending protocol upgrade is stashed.
///
/// Handlers that switch protocols take the value out with
/// `ctx.take::<hyper::upgrade::OnUpgrade>(ON_UPGRADE_KEY)`.
pub const ON_UPGRADE_KEY: &str = "portico.on_upgrade";

/// Runs one hyper request through the routing table.
///
/// The body is buffered up front so handlers see a complete request.
/// Reads that fail map to 400 and reads that stall past `body_timeout`
/// map to 408.
pub(crate) async fn dispatch(
    table: &RouteTable,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
    body_timeout: Duration,
) -> Response<Full<Bytes>> {
    let (mut parts, body) = req.into_parts();
    let on_upgrade = parts.extensions.remove::<OnUpgrade>();

    let body = match tokio::time::timeout(body_timeout, body.collect()).await {
        Ok(Ok(collected)) => collected.to_bytes(),
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "failed to read request body");
            return plain_status(StatusCode::BAD_REQUEST);
        }
        Err(_) => {
            tracing::warn!(timeout_secs = body_timeout.as_secs(), "request body read timed out");
            return plain_status(StatusCode::REQUEST_TIMEOUT);
        }
    };

    execute(
        table,
        parts.method,
        parts.uri,
        parts.headers,
        body,
        Some(remote_addr),
        on_upgrade,
    )
    .await
}

/// Shared execution path for live connections and the test harness.
pub(crate) async fn execute(
    table: &RouteTable,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    on_upgrade: Option<OnUpgrade>,
) -> Response<Full<Bytes>> {
    let (chain, params) = table
        .find(&method, uri.path())
        .unwrap_or_else(|| (table.not_found().clone(), Params::new()));

    let mut ctx = Context::new(method, uri, headers, body);
    ctx.set_chain(chain);
    ctx.set_params(params);
    if let Some(addr) = remote_addr {
        ctx.set_remote_addr(addr);
    }
    if let Some(upgrade) = on_upgrade {
        ctx.set(ON_UPGRADE_KEY, upgrade);
    }

    ctx.run().await;
    ctx.into_response()
}

fn plain_status(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use portico_core::{handler_fn, Context};
    use portico_router::Router;

    use super::*;

    async fn greet(ctx: &mut Context) {
        let name = ctx.param("name").to_owned();
        ctx.string(StatusCode::OK, format!("hello {name}"));
    }

    fn table() -> RouteTable {
        let router = Router::new();
        router.add_route(Method::GET, "/greet/:name", vec![handler_fn(greet)]);
        router.freeze()
    }

    #[tokio::test]
    async fn execute_routes_and_captures_params() {
        let table = table();
        let response = execute(
            &table,
            Method::GET,
            Uri::from_static("/greet/ada"),
            HeaderMap::new(),
            Bytes::new(),
            None,
            None,
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"hello ada");
    }

    #[tokio::test]
    async fn execute_falls_back_to_not_found() {
        let table = table();
        let response = execute(
            &table,
            Method::GET,
            Uri::from_static("/missing"),
            HeaderMap::new(),
            Bytes::new(),
            None,
            None,
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
