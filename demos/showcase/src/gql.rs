//! GraphQL schema mounted at `/graphql`.
//!
//! Queries read the shared state; the subscription demonstrates the
//! WebSocket transport end to end. With the playground enabled the
//! schema can be explored interactively at the configured path.

use std::sync::Arc;
use std::time::Duration;

use async_graphql::{EmptyMutation, Object, Schema, Subscription};
use futures_util::Stream;

use crate::routes::AppState;

/// Query side of the schema.
pub struct QueryRoot {
    state: Arc<AppState>,
}

#[Object]
impl QueryRoot {
    /// The service name.
    async fn service(&self) -> &'static str {
        "portico-showcase"
    }

    /// Number of users currently stored.
    async fn user_count(&self) -> i32 {
        i32::try_from(self.state.users.len()).unwrap_or(i32::MAX)
    }
}

/// Subscription side of the schema.
pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    /// Emits `beats` increasing integers, one every 250ms.
    async fn heartbeat(&self, beats: Option<i32>) -> impl Stream<Item = i32> {
        let beats = beats.unwrap_or(5).max(0);
        futures_util::stream::unfold(0, move |tick| async move {
            if tick >= beats {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
            Some((tick + 1, tick + 1))
        })
    }
}

/// Builds the executable schema over the shared state.
pub fn schema(state: Arc<AppState>) -> Schema<QueryRoot, EmptyMutation, SubscriptionRoot> {
    Schema::new(QueryRoot { state }, EmptyMutation, SubscriptionRoot)
}
