//! # Portico Feature Showcase
//!
//! A small application touring the framework: route groups, custom
//! middleware on top of the built-in stack, cookie sessions, a GraphQL
//! mount with subscriptions, and the in-process test client.
//!
//! ```bash
//! cargo run
//! ```
//!
//! Browse <http://127.0.0.1:8080/> once it is up.

use std::sync::Arc;

mod gql;
mod middleware;
mod routes;

use portico::prelude::*;
use routes::AppState;
use tracing::info;

/// Builds the fully wired application server.
fn build_app(config: AppConfig, state: Arc<AppState>) -> Server {
    let mut server = Server::app(config, Arc::new(NoAssets));

    // Custom middleware lands after the built-in fifteen stages.
    server.use_middleware(&[middleware::timing()]);

    routes::register_routes(&server, &state);
    server.setup_graphql("/graphql", gql::schema(state), None);

    server
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_logging(&LogConfig::for_environment(&config.environment))?;

    let state = Arc::new(AppState::new());
    let server = build_app(config, Arc::clone(&state));

    if server.config().spa.upstream.is_some() {
        server.serve_spa("/app", None)?;
    }

    for line in server.info() {
        info!("{line}");
    }
    info!(routes = server.routes().len(), "routes registered");

    server
        .listen_with_shutdown(ShutdownSignal::with_os_signals())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use portico::prelude::{AppConfig, StatusCode};
    use portico_test::{TestClient, TestResponse};
    use serde_json::json;

    use crate::routes::AppState;

    fn client() -> TestClient {
        let state = Arc::new(AppState::new());
        TestClient::new(crate::build_app(AppConfig::test(), state))
    }

    fn set_cookies(response: &TestResponse) -> Vec<String> {
        response
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(ToOwned::to_owned)
            .collect()
    }

    fn csrf_token(response: &TestResponse) -> String {
        set_cookies(response)
            .iter()
            .find_map(|cookie| cookie.strip_prefix("_csrf_token="))
            .and_then(|rest| rest.split(';').next())
            .map(ToOwned::to_owned)
            .unwrap()
    }

    #[tokio::test]
    async fn health_probe_answers_before_routing() {
        let response = client().get("/health").send().await;
        response.assert_status(StatusCode::OK);
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn welcome_page_is_html_with_a_timing_stamp() {
        let response = client().get("/").send().await;
        response.assert_status(StatusCode::OK);
        assert!(response.content_type().unwrap_or("").starts_with("text/html"));
        assert!(response.header("x-response-time").unwrap().ends_with("ms"));
    }

    #[tokio::test]
    async fn user_crud_round_trip() {
        let client = client();

        let created = client
            .post("/api/v1/users")
            .header("x-api-only", "1")
            .json(&json!({ "name": "Ada Lovelace", "email": "ada@example.com" }))
            .send()
            .await;
        created.assert_status(StatusCode::CREATED);
        created.assert_json_field("name", &json!("Ada Lovelace"));
        let id = created.json_value().unwrap()["id"]
            .as_str()
            .unwrap()
            .to_owned();

        let fetched = client.get(format!("/api/v1/users/{id}")).send().await;
        fetched.assert_status(StatusCode::OK);
        fetched.assert_json_field("email", &json!("ada@example.com"));

        let listed = client.get("/api/v1/users?search=ada").send().await;
        listed.assert_status(StatusCode::OK);
        listed.assert_json_field("total", &json!(1));

        let updated = client
            .put(format!("/api/v1/users/{id}"))
            .header("x-api-only", "1")
            .json(&json!({ "name": "Ada King" }))
            .send()
            .await;
        updated.assert_status(StatusCode::OK);
        updated.assert_json_field("name", &json!("Ada King"));

        let deleted = client
            .delete(format!("/api/v1/users/{id}"))
            .header("x-api-only", "1")
            .send()
            .await;
        deleted.assert_status(StatusCode::NO_CONTENT);

        let gone = client.get(format!("/api/v1/users/{id}")).send().await;
        gone.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn browser_login_flow_passes_the_csrf_check() {
        let client = client();

        // A safe request mints the CSRF token cookie.
        let probe = client.get("/api/v1/auth/session").send().await;
        probe.assert_status(StatusCode::UNAUTHORIZED);
        let token = csrf_token(&probe);

        // The double-submit pair: token cookie plus matching header.
        let login = client
            .post("/api/v1/auth/login")
            .header("cookie", format!("_csrf_token={token}"))
            .header("x-csrf-token", token)
            .json(&json!({ "username": "admin", "password": "portico" }))
            .send()
            .await;
        login.assert_status(StatusCode::OK);
        let cookies = set_cookies(&login);
        assert!(cookies
            .iter()
            .any(|cookie| cookie.starts_with("showcase_session=")));

        let session_id = login.json_value().unwrap()["session"]
            .as_str()
            .unwrap()
            .to_owned();
        let session = client
            .get("/api/v1/auth/session")
            .header("cookie", format!("showcase_session={session_id}"))
            .send()
            .await;
        session.assert_status(StatusCode::OK);
        session.assert_json_field("authenticated", &json!(true));
    }

    #[tokio::test]
    async fn post_without_csrf_or_api_header_is_forbidden() {
        let response = client()
            .post("/api/v1/auth/login")
            .json(&json!({ "username": "admin", "password": "portico" }))
            .send()
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_routes_require_the_api_key() {
        let client = client();

        let denied = client.get("/api/v1/admin/stats").send().await;
        denied.assert_status(StatusCode::UNAUTHORIZED);

        let allowed = client
            .get("/api/v1/admin/stats")
            .header("x-api-key", "showcase-admin-key")
            .send()
            .await;
        allowed.assert_status(StatusCode::OK);
        allowed.assert_json_field("users", &json!(0));
    }

    #[tokio::test]
    async fn graphql_query_resolves_against_state() {
        let response = client()
            .post("/graphql")
            .header("x-api-only", "1")
            .json(&json!({ "query": "{ service userCount }" }))
            .send()
            .await;
        response.assert_status(StatusCode::OK);
        response.assert_json_field("data.service", &json!("portico-showcase"));
        response.assert_json_field("data.userCount", &json!(0));
    }

    #[tokio::test]
    async fn unknown_routes_fall_through_to_the_404_page() {
        let response = client().get("/definitely-not-here").send().await;
        response.assert_status(StatusCode::NOT_FOUND);
        response.assert_body_contains("404");
    }
}
