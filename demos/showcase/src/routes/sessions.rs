//! Login, logout, and session introspection.
//!
//! Demonstrates the cookie helpers and redirect responses. Credentials
//! are checked against a fixed demo account, not a credential store.

use portico::middleware::cookies::{build_cookie, request_cookie};
use portico::prelude::{boxed_handler, HandlerFunc, StatusCode};
use serde::Deserialize;
use uuid::Uuid;

/// The session cookie set on login.
pub const SESSION_COOKIE: &str = "showcase_session";

const DEMO_USER: &str = "admin";
const DEMO_PASSWORD: &str = "portico";

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

/// `POST /auth/login`, setting the session cookie on success.
pub fn login() -> HandlerFunc {
    boxed_handler(|ctx| {
        Box::pin(async move {
            let request: LoginRequest = match ctx.body_json() {
                Ok(request) => request,
                Err(_) => {
                    ctx.json(
                        StatusCode::UNPROCESSABLE_ENTITY,
                        &serde_json::json!({ "error": "username and password are required" }),
                    );
                    return;
                }
            };
            if request.username != DEMO_USER || request.password != DEMO_PASSWORD {
                ctx.json(
                    StatusCode::UNAUTHORIZED,
                    &serde_json::json!({ "error": "invalid credentials" }),
                );
                return;
            }

            let session_id = Uuid::new_v4().simple().to_string();
            ctx.add_header(
                "set-cookie",
                build_cookie(SESSION_COOKIE, &session_id, 3600, true),
            );
            ctx.json(StatusCode::OK, &serde_json::json!({ "session": session_id }));
        })
    })
}

/// `GET /auth/session`, reporting the session cookie if present.
pub fn introspect() -> HandlerFunc {
    boxed_handler(|ctx| {
        Box::pin(async move {
            let session = request_cookie(ctx, SESSION_COOKIE);
            match session {
                Some(session) => ctx.json(
                    StatusCode::OK,
                    &serde_json::json!({ "session": session, "authenticated": true }),
                ),
                None => ctx.json(
                    StatusCode::UNAUTHORIZED,
                    &serde_json::json!({ "error": "no active session" }),
                ),
            }
        })
    })
}

/// `POST /auth/logout`, clearing the cookie and redirecting home.
pub fn logout() -> HandlerFunc {
    boxed_handler(|ctx| {
        Box::pin(async move {
            ctx.add_header("set-cookie", build_cookie(SESSION_COOKIE, "", 0, true));
            ctx.redirect(StatusCode::FOUND, "/");
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use portico::http::HeaderMap;
    use portico::prelude::{Chain, Context, Method};

    async fn run_login(body: &str) -> Context {
        let chain: Chain = vec![login()].into();
        let mut ctx = Context::new(
            Method::POST,
            "/auth/login".parse().unwrap(),
            HeaderMap::new(),
            Bytes::from(body.to_owned()),
        );
        ctx.set_chain(chain);
        ctx.run().await;
        ctx
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let ctx = run_login(r#"{"username":"admin","password":"wrong"}"#).await;
        assert_eq!(ctx.response_status(), StatusCode::UNAUTHORIZED);
        assert!(ctx.response_header("set-cookie").is_none());
    }

    #[tokio::test]
    async fn test_login_sets_the_session_cookie() {
        let ctx = run_login(r#"{"username":"admin","password":"portico"}"#).await;
        assert_eq!(ctx.response_status(), StatusCode::OK);

        let cookie = ctx.response_header("set-cookie").unwrap();
        assert!(cookie.starts_with("showcase_session="));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn test_introspect_reads_the_cookie() {
        let chain: Chain = vec![introspect()].into();
        let mut headers = HeaderMap::new();
        headers.insert("cookie", "showcase_session=abc123".parse().unwrap());
        let mut ctx = Context::new(
            Method::GET,
            "/auth/session".parse().unwrap(),
            headers,
            Bytes::new(),
        );
        ctx.set_chain(chain);
        ctx.run().await;

        assert_eq!(ctx.response_status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(ctx.response_body()).unwrap();
        assert_eq!(body["session"], "abc123");
    }

    #[tokio::test]
    async fn test_logout_clears_and_redirects() {
        let chain: Chain = vec![logout()].into();
        let mut ctx = Context::for_chain(Method::POST, "/auth/logout", chain);
        ctx.run().await;

        assert_eq!(ctx.response_status(), StatusCode::FOUND);
        assert_eq!(ctx.response_header("location"), Some("/"));
        let cookie = ctx.response_header("set-cookie").unwrap();
        assert!(cookie.contains("Max-Age=0"));
    }
}
