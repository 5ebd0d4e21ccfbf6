//! Server-side session middleware.
//!
//! Identifies clients with a session cookie and keeps their state in an
//! in-memory [`DashMap`]. Each request either resumes the session named
//! by the cookie or starts a fresh one; the id cookie is (re)written on
//! the way out with a sliding expiry.
//!
//! Handlers reach the session through the context store:
//!
//! ```ignore
//! let session = ctx.get::<Session>(SESSION_KEY).cloned();
//! if let Some(session) = session {
//!     session.insert("user_id", 42);
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use portico_core::{BoxFuture, Context, Handler};
use portico_config::SessionConfig;
use serde_json::Value;
use uuid::Uuid;

use crate::cookies::{build_cookie, request_cookie};

/// The context store key holding the [`Session`] handle.
pub const SESSION_KEY: &str = "session";

struct SessionEntry {
    values: HashMap<String, Value>,
    expires_at: Instant,
}

/// In-memory session store, doubling as the middleware stage.
///
/// Cloning is cheap; clones share the same underlying map.
#[derive(Clone)]
pub struct SessionStore {
    entries: Arc<DashMap<String, SessionEntry>>,
    config: SessionConfig,
}

impl SessionStore {
    /// Creates a session store from its config section.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            config,
        }
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.ttl_secs)
    }

    /// Starts a new session and returns its id.
    #[must_use]
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.entries.insert(
            id.clone(),
            SessionEntry {
                values: HashMap::new(),
                expires_at: Instant::now() + self.ttl(),
            },
        );
        id
    }

    /// Resumes the session with `id`, sliding its expiry. Returns false
    /// when the session is unknown or expired; an expired entry is
    /// dropped.
    pub fn touch(&self, id: &str) -> bool {
        let Some(mut entry) = self.entries.get_mut(id) else {
            return false;
        };
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove(id);
            return false;
        }
        entry.expires_at = Instant::now() + self.ttl();
        true
    }

    /// Removes the session with `id` entirely.
    pub fn destroy(&self, id: &str) {
        self.entries.remove(id);
    }

    /// The number of live sessions (including not-yet-swept expired ones).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn handle(&self, id: String) -> Session {
        Session {
            id,
            entries: Arc::clone(&self.entries),
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.entries.len())
            .field("config", &self.config)
            .finish()
    }
}

/// A handle to one client's session, stored in the context.
///
/// Cloning is cheap; clones address the same session.
#[derive(Clone)]
pub struct Session {
    id: String,
    entries: Arc<DashMap<String, SessionEntry>>,
}

impl Session {
    /// The session id, as carried by the cookie.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Reads a value from the session.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries
            .get(&self.id)
            .and_then(|entry| entry.values.get(key).cloned())
    }

    /// Writes a value into the session.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) {
        if let Some(mut entry) = self.entries.get_mut(&self.id) {
            entry.values.insert(key.into(), value.into());
        }
    }

    /// Removes a value from the session.
    pub fn remove(&self, key: &str) {
        if let Some(mut entry) = self.entries.get_mut(&self.id) {
            entry.values.remove(key);
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish()
    }
}

impl Handler for SessionStore {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let id = request_cookie(ctx, &self.config.cookie_name)
                .filter(|id| self.touch(id))
                .unwrap_or_else(|| self.create());

            ctx.set(SESSION_KEY, self.handle(id.clone()));
            ctx.next().await;

            ctx.add_header(
                "set-cookie",
                build_cookie(&self.config.cookie_name, &id, self.config.ttl_secs, true),
            );
        })
    }
}
