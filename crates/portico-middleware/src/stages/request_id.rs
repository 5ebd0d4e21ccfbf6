//! Request ID middleware.
//!
//! Assigns every request a unique identifier for log correlation. An
//! incoming `x-request-id` header is honored; otherwise a UUID v7 is
//! minted (time-ordered, so IDs sort by arrival). The ID is stored in
//! the context and echoed on the response.

use portico_core::{BoxFuture, Context, Handler};
use uuid::Uuid;

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The context store key holding the request ID as a `String`.
pub const REQUEST_ID_KEY: &str = "request_id";

/// Middleware that assigns and propagates request IDs.
#[derive(Debug, Clone, Default)]
pub struct RequestId;

impl RequestId {
    /// Creates a new request ID stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Handler for RequestId {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let id = ctx
                .request_header(REQUEST_ID_HEADER)
                .filter(|value| !value.is_empty())
                .map_or_else(|| Uuid::now_v7().to_string(), ToString::to_string);

            ctx.set(REQUEST_ID_KEY, id.clone());
            ctx.header(REQUEST_ID_HEADER, &id);
            ctx.next().await;
        })
    }
}
