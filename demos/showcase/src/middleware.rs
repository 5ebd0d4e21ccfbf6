//! Application middleware registered on top of the built-in stack.
//!
//! Both are ordinary handlers built with `boxed_handler`; work before
//! `ctx.next().await` runs on the way in, work after it runs on the way
//! out.

use std::time::Instant;

use portico::prelude::{boxed_handler, HandlerFunc, StatusCode};

/// Stamps every response with an `x-response-time` header.
pub fn timing() -> HandlerFunc {
    boxed_handler(|ctx| {
        Box::pin(async move {
            let started = Instant::now();
            ctx.next().await;
            let millis = started.elapsed().as_millis();
            ctx.header("x-response-time", format!("{millis}ms"));
        })
    })
}

/// Rejects requests that lack the expected `x-api-key` header.
///
/// Registered as group middleware on `/api/v1/admin`, so every route in
/// that group inherits the check.
pub fn require_api_key(expected: impl Into<String>) -> HandlerFunc {
    let expected = expected.into();
    boxed_handler(move |ctx| {
        let expected = expected.clone();
        Box::pin(async move {
            let authorized = ctx
                .request_header("x-api-key")
                .is_some_and(|key| key == expected);
            if authorized {
                ctx.next().await;
            } else {
                ctx.json(
                    StatusCode::UNAUTHORIZED,
                    &serde_json::json!({ "error": "missing or invalid api key" }),
                );
                ctx.abort();
            }
        })
    })
}
