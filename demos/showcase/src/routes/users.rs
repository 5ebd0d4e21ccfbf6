//! User CRUD routes.
//!
//! | Method | Path           | Description                     |
//! |--------|----------------|---------------------------------|
//! | GET    | /users         | List users (paginated, search)  |
//! | POST   | /users         | Create a user                   |
//! | GET    | /users/:id     | Fetch a user by id              |
//! | PUT    | /users/:id     | Update name or email            |
//! | DELETE | /users/:id     | Delete a user                   |
//!
//! Each registration takes a handler built by one of the constructors
//! below, which close over the shared state.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use portico::prelude::{boxed_handler, HandlerFunc, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::routes::AppState;

/// A stored user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Record id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
    /// Creation time, seconds since the Unix epoch.
    pub created_at: u64,
}

#[derive(Debug, Deserialize)]
struct CreateUserRequest {
    name: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct UpdateUserRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

fn error_body(message: &str) -> serde_json::Value {
    serde_json::json!({ "error": message })
}

fn parse_count(raw: &str, default: usize) -> usize {
    raw.parse().ok().filter(|n| *n > 0).unwrap_or(default)
}

/// `GET /users` with `page`, `per_page`, and `search` query parameters.
pub fn list(state: Arc<AppState>) -> HandlerFunc {
    boxed_handler(move |ctx| {
        let state = Arc::clone(&state);
        Box::pin(async move {
            let mut users: Vec<User> = state
                .users
                .iter()
                .map(|entry| entry.value().clone())
                .collect();

            let search = ctx.query("search").to_lowercase();
            if !search.is_empty() {
                users.retain(|user| user.name.to_lowercase().contains(&search));
            }
            users.sort_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.id.cmp(&b.id))
            });

            let page = parse_count(&ctx.query("page"), 1);
            let per_page = parse_count(&ctx.query("per_page"), 20).min(100);
            let total = users.len();
            let start = page.saturating_sub(1).saturating_mul(per_page);
            let items: Vec<User> = users.into_iter().skip(start).take(per_page).collect();

            ctx.json(
                StatusCode::OK,
                &serde_json::json!({
                    "items": items,
                    "page": page,
                    "per_page": per_page,
                    "total": total,
                }),
            );
        })
    })
}

/// `POST /users` with a JSON body.
pub fn create(state: Arc<AppState>) -> HandlerFunc {
    boxed_handler(move |ctx| {
        let state = Arc::clone(&state);
        Box::pin(async move {
            let request: CreateUserRequest = match ctx.body_json() {
                Ok(request) => request,
                Err(error) => {
                    ctx.json(StatusCode::UNPROCESSABLE_ENTITY, &error_body(&error.to_string()));
                    return;
                }
            };
            if request.name.trim().is_empty() || !request.email.contains('@') {
                ctx.json(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    &error_body("name and a valid email are required"),
                );
                return;
            }

            let user = User {
                id: Uuid::new_v4(),
                name: request.name,
                email: request.email,
                created_at: unix_now(),
            };
            state.users.insert(user.id, user.clone());

            ctx.header("location", format!("/api/v1/users/{}", user.id));
            ctx.json(StatusCode::CREATED, &user);
        })
    })
}

/// `GET /users/:id`.
pub fn fetch(state: Arc<AppState>) -> HandlerFunc {
    boxed_handler(move |ctx| {
        let state = Arc::clone(&state);
        Box::pin(async move {
            let id = match ctx.param("id").parse::<Uuid>() {
                Ok(id) => id,
                Err(_) => {
                    ctx.json(StatusCode::BAD_REQUEST, &error_body("invalid user id"));
                    return;
                }
            };
            let found = state.users.get(&id).map(|entry| entry.value().clone());
            match found {
                Some(user) => ctx.json(StatusCode::OK, &user),
                None => ctx.json(StatusCode::NOT_FOUND, &error_body("user not found")),
            }
        })
    })
}

/// `PUT /users/:id` with a JSON body of optional fields.
pub fn update(state: Arc<AppState>) -> HandlerFunc {
    boxed_handler(move |ctx| {
        let state = Arc::clone(&state);
        Box::pin(async move {
            let id = match ctx.param("id").parse::<Uuid>() {
                Ok(id) => id,
                Err(_) => {
                    ctx.json(StatusCode::BAD_REQUEST, &error_body("invalid user id"));
                    return;
                }
            };
            let request: UpdateUserRequest = match ctx.body_json() {
                Ok(request) => request,
                Err(error) => {
                    ctx.json(StatusCode::UNPROCESSABLE_ENTITY, &error_body(&error.to_string()));
                    return;
                }
            };

            let updated = match state.users.get_mut(&id) {
                Some(mut entry) => {
                    if let Some(name) = request.name {
                        entry.value_mut().name = name;
                    }
                    if let Some(email) = request.email {
                        entry.value_mut().email = email;
                    }
                    Some(entry.value().clone())
                }
                None => None,
            };
            match updated {
                Some(user) => ctx.json(StatusCode::OK, &user),
                None => ctx.json(StatusCode::NOT_FOUND, &error_body("user not found")),
            }
        })
    })
}

/// `DELETE /users/:id`, answering 204 on success.
pub fn remove(state: Arc<AppState>) -> HandlerFunc {
    boxed_handler(move |ctx| {
        let state = Arc::clone(&state);
        Box::pin(async move {
            let id = match ctx.param("id").parse::<Uuid>() {
                Ok(id) => id,
                Err(_) => {
                    ctx.json(StatusCode::BAD_REQUEST, &error_body("invalid user id"));
                    return;
                }
            };
            if state.users.remove(&id).is_some() {
                ctx.status(StatusCode::NO_CONTENT);
            } else {
                ctx.json(StatusCode::NOT_FOUND, &error_body("user not found"));
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use portico::http::HeaderMap;
    use portico::prelude::{Chain, Context, Method};

    fn post(path: &str, body: &str) -> Context {
        Context::new(
            Method::POST,
            path.parse().unwrap(),
            HeaderMap::new(),
            Bytes::from(body.to_owned()),
        )
    }

    #[tokio::test]
    async fn test_create_stores_and_answers_201() {
        let state = Arc::new(AppState::new());
        let chain: Chain = vec![create(Arc::clone(&state))].into();
        let mut ctx = post("/users", r#"{"name":"Ada","email":"ada@example.com"}"#);
        ctx.set_chain(chain);
        ctx.run().await;

        assert_eq!(ctx.response_status(), StatusCode::CREATED);
        assert_eq!(state.users.len(), 1);
        assert!(ctx.response_header("location").is_some());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_email() {
        let state = Arc::new(AppState::new());
        let chain: Chain = vec![create(Arc::clone(&state))].into();
        let mut ctx = post("/users", r#"{"name":"Ada","email":"nope"}"#);
        ctx.set_chain(chain);
        ctx.run().await;

        assert_eq!(ctx.response_status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(state.users.is_empty());
    }

    #[test]
    fn test_update_request_fields_default_to_none() {
        let request: UpdateUserRequest = serde_json::from_str("{}").unwrap();
        assert!(request.name.is_none());
        assert!(request.email.is_none());
    }

    #[test]
    fn test_user_serializes_with_id_and_timestamps() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada".to_owned(),
            email: "ada@example.com".to_owned(),
            created_at: 1_700_000_000,
        };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["name"], "Ada");
        assert_eq!(value["created_at"], 1_700_000_000_u64);
    }

    #[test]
    fn test_parse_count_ignores_junk_and_zero() {
        assert_eq!(parse_count("3", 1), 3);
        assert_eq!(parse_count("0", 1), 1);
        assert_eq!(parse_count("junk", 20), 20);
        assert_eq!(parse_count("", 20), 20);
    }
}
