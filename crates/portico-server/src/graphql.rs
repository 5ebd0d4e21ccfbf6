//! GraphQL endpoint handlers.
//!
//! [`GraphQlPost`] answers queries and mutations over plain POST.
//! [`GraphQlWs`] upgrades the connection and speaks the
//! `graphql-transport-ws` subscription protocol over it.

use std::collections::HashMap;

use async_graphql::Executor;
use http::StatusCode;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use portico_core::{BoxFuture, Context, Handler};
use portico_ws::{
    is_upgrade_request, requested_protocols, validate_upgrade, CloseCode, Message, WebSocket,
};
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::dispatch::ON_UPGRADE_KEY;

/// Subprotocol name echoed back when the client offers it.
const GRAPHQL_WS_PROTOCOL: &str = "graphql-transport-ws";

/// Terminal handler that executes GraphQL requests posted as JSON.
#[derive(Debug, Clone)]
pub struct GraphQlPost<E> {
    executor: E,
}

impl<E> GraphQlPost<E> {
    /// Wraps an executor, usually an `async_graphql::Schema`.
    pub fn new(executor: E) -> Self {
        Self { executor }
    }
}

impl<E: Executor> GraphQlPost<E> {
    async fn respond(&self, ctx: &mut Context) {
        let request: async_graphql::Request = match serde_json::from_slice(ctx.body()) {
            Ok(request) => request,
            Err(err) => {
                ctx.json(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    &json!({ "errors": [{ "message": format!("invalid GraphQL request: {err}") }] }),
                );
                return;
            }
        };

        let response = self.executor.execute(request).await;
        ctx.json(StatusCode::OK, &response);
    }
}

impl<E: Executor> Handler for GraphQlPost<E> {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(self.respond(ctx))
    }
}

/// Terminal handler that upgrades the connection and serves GraphQL
/// subscriptions over it.
#[derive(Debug, Clone)]
pub struct GraphQlWs<E> {
    executor: E,
}

impl<E> GraphQlWs<E> {
    /// Wraps an executor, usually an `async_graphql::Schema`.
    pub fn new(executor: E) -> Self {
        Self { executor }
    }
}

impl<E: Executor> GraphQlWs<E> {
    async fn upgrade(&self, ctx: &mut Context) {
        if !is_upgrade_request(ctx.method(), ctx.request_headers()) {
            ctx.string(StatusCode::BAD_REQUEST, "WebSocket upgrade required");
            return;
        }
        let accept_key = match validate_upgrade(ctx.method(), ctx.request_headers()) {
            Ok(key) => key,
            Err(err) => {
                ctx.string(StatusCode::BAD_REQUEST, err.to_string());
                return;
            }
        };
        let Some(on_upgrade) = ctx.take::<OnUpgrade>(ON_UPGRADE_KEY) else {
            ctx.string(StatusCode::BAD_REQUEST, "connection cannot be upgraded");
            return;
        };

        ctx.status(StatusCode::SWITCHING_PROTOCOLS);
        ctx.header("connection", "Upgrade");
        ctx.header("upgrade", "websocket");
        ctx.header("sec-websocket-accept", &accept_key);
        if requested_protocols(ctx.request_headers())
            .iter()
            .any(|protocol| protocol == GRAPHQL_WS_PROTOCOL)
        {
            ctx.header("sec-websocket-protocol", GRAPHQL_WS_PROTOCOL);
        }

        let executor = self.executor.clone();
        tokio::spawn(async move {
            match on_upgrade.await {
                Ok(upgraded) => {
                    let ws = WebSocket::from_upgraded(TokioIo::new(upgraded)).await;
                    subscription_loop(executor, ws).await;
                }
                Err(err) => {
                    tracing::debug!(error = %err, "websocket upgrade failed");
                }
            }
        });
    }
}

impl<E: Executor> Handler for GraphQlWs<E> {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(self.upgrade(ctx))
    }
}

#[derive(Debug, Deserialize)]
struct ClientMessage {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

/// Drives one `graphql-transport-ws` session until the peer disconnects.
///
/// Each active subscription runs as its own task and funnels outgoing
/// frames through a channel so the socket is written from one place.
async fn subscription_loop<E, S>(executor: E, mut ws: WebSocket<S>)
where
    E: Executor,
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (out_tx, mut out_rx) = mpsc::channel::<String>(16);
    let mut subscriptions: HashMap<String, JoinHandle<()>> = HashMap::new();
    let mut initialised = false;

    loop {
        tokio::select! {
            frame = out_rx.recv() => {
                // The loop holds a sender, so recv only yields values.
                let Some(frame) = frame else { break };
                if ws.send_text(frame).await.is_err() {
                    break;
                }
            }
            message = ws.recv() => {
                let text = match message {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(err)) => {
                        tracing::debug!(error = %err, "websocket receive failed");
                        break;
                    }
                };

                let parsed: ClientMessage = match serde_json::from_str(text.as_str()) {
                    Ok(parsed) => parsed,
                    Err(_) => {
                        let _ = ws.close(CloseCode::InvalidPayload, "invalid message").await;
                        break;
                    }
                };

                match parsed.kind.as_str() {
                    "connection_init" => {
                        if initialised {
                            let _ = ws
                                .close(CloseCode::PolicyViolation, "connection already initialised")
                                .await;
                            break;
                        }
                        initialised = true;
                        if ws.send_text(ack_frame()).await.is_err() {
                            break;
                        }
                    }
                    "ping" => {
                        if ws.send_text(pong_frame()).await.is_err() {
                            break;
                        }
                    }
                    "pong" => {}
                    "subscribe" => {
                        if !initialised {
                            let _ = ws
                                .close(CloseCode::PolicyViolation, "connection not initialised")
                                .await;
                            break;
                        }
                        let Some(id) = parsed.id else {
                            let _ = ws
                                .close(CloseCode::InvalidPayload, "subscribe without id")
                                .await;
                            break;
                        };
                        subscriptions.retain(|_, task| !task.is_finished());
                        if subscriptions.contains_key(&id) {
                            let reason = format!("subscriber {id} already exists");
                            let _ = ws.close(CloseCode::PolicyViolation, &reason).await;
                            break;
                        }
                        let request = parsed
                            .payload
                            .map(serde_json::from_value::<async_graphql::Request>);
                        let Some(Ok(request)) = request else {
                            if ws
                                .send_text(error_frame(&id, "invalid subscribe payload"))
                                .await
                                .is_err()
                            {
                                break;
                            }
                            continue;
                        };
                        let task = tokio::spawn(run_subscription(
                            executor.clone(),
                            id.clone(),
                            request,
                            out_tx.clone(),
                        ));
                        subscriptions.insert(id, task);
                    }
                    "complete" => {
                        if let Some(id) = parsed.id {
                            if let Some(task) = subscriptions.remove(&id) {
                                task.abort();
                            }
                        }
                    }
                    other => {
                        let reason = format!("unknown message type {other}");
                        let _ = ws.close(CloseCode::InvalidPayload, &reason).await;
                        break;
                    }
                }
            }
        }
    }

    for task in subscriptions.into_values() {
        task.abort();
    }
}

async fn run_subscription<E: Executor>(
    executor: E,
    id: String,
    request: async_graphql::Request,
    out: mpsc::Sender<String>,
) {
    use futures_util::StreamExt;

    let mut stream = executor.execute_stream(request, None);
    while let Some(response) = stream.next().await {
        if out.send(next_frame(&id, &response)).await.is_err() {
            return;
        }
    }
    let _ = out.send(complete_frame(&id)).await;
}

fn ack_frame() -> String {
    json!({ "type": "connection_ack" }).to_string()
}

fn pong_frame() -> String {
    json!({ "type": "pong" }).to_string()
}

fn next_frame(id: &str, response: &async_graphql::Response) -> String {
    json!({ "id": id, "type": "next", "payload": response }).to_string()
}

fn error_frame(id: &str, message: &str) -> String {
    json!({ "id": id, "type": "error", "payload": [{ "message": message }] }).to_string()
}

fn complete_frame(id: &str) -> String {
    json!({ "id": id, "type": "complete" }).to_string()
}

#[cfg(test)]
mod tests {
    use async_graphql::{EmptyMutation, Object, Schema, Subscription};
    use bytes::Bytes;
    use futures_util::{SinkExt, StreamExt};
    use http::{HeaderMap, Method, Uri};
    use tokio_tungstenite::tungstenite::protocol::Role;
    use tokio_tungstenite::WebSocketStream;

    use super::*;

    struct QueryRoot;

    #[Object]
    impl QueryRoot {
        async fn value(&self) -> i32 {
            7
        }
    }

    struct SubscriptionRoot;

    #[Subscription]
    impl SubscriptionRoot {
        async fn ticks(&self) -> impl futures_util::Stream<Item = i32> {
            futures_util::stream::iter(1..=3)
        }
    }

    fn schema() -> Schema<QueryRoot, EmptyMutation, SubscriptionRoot> {
        Schema::new(QueryRoot, EmptyMutation, SubscriptionRoot)
    }

    fn request_ctx(body: &'static [u8]) -> Context {
        Context::new(
            Method::POST,
            Uri::from_static("/graphql"),
            HeaderMap::new(),
            Bytes::from_static(body),
        )
    }

    #[tokio::test]
    async fn post_executes_query() {
        let handler = GraphQlPost::new(schema());
        let mut ctx = request_ctx(br#"{"query": "{ value }"}"#);

        handler.call(&mut ctx).await;

        assert_eq!(ctx.response_status(), StatusCode::OK);
        let body = String::from_utf8_lossy(ctx.response_body()).into_owned();
        assert!(body.contains(r#""value":7"#), "unexpected body: {body}");
    }

    #[tokio::test]
    async fn post_rejects_unparseable_body() {
        let handler = GraphQlPost::new(schema());
        let mut ctx = request_ctx(b"");

        handler.call(&mut ctx).await;

        assert_eq!(ctx.response_status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = String::from_utf8_lossy(ctx.response_body()).into_owned();
        assert!(body.contains("invalid GraphQL request"));
    }

    #[tokio::test]
    async fn ws_handler_rejects_plain_get() {
        let handler = GraphQlWs::new(schema());
        let mut ctx = Context::new(
            Method::GET,
            Uri::from_static("/graphql"),
            HeaderMap::new(),
            Bytes::new(),
        );

        handler.call(&mut ctx).await;

        assert_eq!(ctx.response_status(), StatusCode::BAD_REQUEST);
    }

    async fn next_json<S>(client: &mut WebSocketStream<S>) -> serde_json::Value
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(text.as_str()).unwrap();
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                other => panic!("expected a text frame, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn subscription_protocol_round_trip() {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let server = tokio::spawn(async move {
            let stream = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
            subscription_loop(schema(), WebSocket::new(stream)).await;
        });
        let mut client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;

        client
            .send(Message::Text(r#"{"type":"connection_init"}"#.into()))
            .await
            .unwrap();
        let ack = next_json(&mut client).await;
        assert_eq!(ack["type"], "connection_ack");

        client
            .send(Message::Text(
                r#"{"id":"1","type":"subscribe","payload":{"query":"subscription { ticks }"}}"#
                    .into(),
            ))
            .await
            .unwrap();

        for expected in 1..=3 {
            let frame = next_json(&mut client).await;
            assert_eq!(frame["type"], "next");
            assert_eq!(frame["id"], "1");
            assert_eq!(frame["payload"]["data"]["ticks"], expected);
        }

        let done = next_json(&mut client).await;
        assert_eq!(done["type"], "complete");
        assert_eq!(done["id"], "1");

        client.close(None).await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn subscribe_before_init_closes_the_socket() {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let server = tokio::spawn(async move {
            let stream = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
            subscription_loop(schema(), WebSocket::new(stream)).await;
        });
        let mut client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;

        client
            .send(Message::Text(
                r#"{"id":"1","type":"subscribe","payload":{"query":"subscription { ticks }"}}"#
                    .into(),
            ))
            .await
            .unwrap();

        loop {
            match client.next().await {
                Some(Ok(Message::Close(Some(frame)))) => {
                    assert_eq!(u16::from(frame.code), 1008);
                    break;
                }
                Some(Ok(_)) => {}
                other => panic!("expected a close frame, got {other:?}"),
            }
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn protocol_ping_answered_with_pong_frame() {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let server = tokio::spawn(async move {
            let stream = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
            subscription_loop(schema(), WebSocket::new(stream)).await;
        });
        let mut client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;

        client
            .send(Message::Text(r#"{"type":"connection_init"}"#.into()))
            .await
            .unwrap();
        let ack = next_json(&mut client).await;
        assert_eq!(ack["type"], "connection_ack");

        client
            .send(Message::Text(r#"{"type":"ping"}"#.into()))
            .await
            .unwrap();
        let pong = next_json(&mut client).await;
        assert_eq!(pong["type"], "pong");

        client.close(None).await.unwrap();
        server.await.unwrap();
    }
}
