//! Route registration and shared application state.

pub mod sessions;
pub mod users;

use std::sync::Arc;

use dashmap::DashMap;
use portico::prelude::{boxed_handler, handler_fn, Context, HandlerFunc, Server, StatusCode};
use uuid::Uuid;

use crate::middleware;

/// In-memory state shared by every handler.
pub struct AppState {
    /// User records by id.
    pub users: DashMap<Uuid, users::User>,
}

impl AppState {
    /// Creates empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

const WELCOME_PAGE: &str = "<!DOCTYPE html>\n<html>\n<head><title>Portico Showcase</title></head>\n<body>\n<h1>Portico Showcase</h1>\n<ul>\n<li><a href=\"/api/v1/users\">/api/v1/users</a> - user CRUD</li>\n<li><a href=\"/graphiql\">/graphiql</a> - GraphQL playground</li>\n<li><a href=\"/health\">/health</a> - liveness probe</li>\n</ul>\n</body>\n</html>\n";

async fn welcome(ctx: &mut Context) {
    ctx.html(StatusCode::OK, WELCOME_PAGE);
}

fn stats(state: Arc<AppState>) -> HandlerFunc {
    boxed_handler(move |ctx| {
        let state = Arc::clone(&state);
        Box::pin(async move {
            ctx.json(
                StatusCode::OK,
                &serde_json::json!({ "users": state.users.len() }),
            );
        })
    })
}

/// Registers every application route on `server`.
///
/// `/health` is not registered here: the built-in health check stage
/// answers it before routing.
pub fn register_routes(server: &Server, state: &Arc<AppState>) {
    server.get("/", &[handler_fn(welcome)]);

    let api = server.group("/api/v1", &[]);

    api.get("/users", &[users::list(Arc::clone(state))]);
    api.post("/users", &[users::create(Arc::clone(state))]);
    api.get("/users/:id", &[users::fetch(Arc::clone(state))]);
    api.put("/users/:id", &[users::update(Arc::clone(state))]);
    api.delete("/users/:id", &[users::remove(Arc::clone(state))]);

    api.post("/auth/login", &[sessions::login()]);
    api.get("/auth/session", &[sessions::introspect()]);
    api.post("/auth/logout", &[sessions::logout()]);

    // The guard is group middleware: every admin route inherits it.
    let admin = api.group("/admin", &[middleware::require_api_key("showcase-admin-key")]);
    admin.get("/stats", &[stats(Arc::clone(state))]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico::prelude::{AppConfig, NoAssets};

    #[test]
    fn test_registration_covers_the_expected_routes() {
        let server = Server::app(AppConfig::test(), Arc::new(NoAssets));
        let state = Arc::new(AppState::new());
        register_routes(&server, &state);

        let routes = server.routes();
        assert_eq!(routes.len(), 10);
        assert!(routes
            .iter()
            .any(|route| route.path() == "/api/v1/users/:id"));
        assert!(routes
            .iter()
            .any(|route| route.path() == "/api/v1/admin/stats"));
    }
}
