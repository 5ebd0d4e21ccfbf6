//! Configuration schema types.
//!
//! One struct per configuration section. Every field has a serde
//! default so partial files and partial environments always produce a
//! complete configuration.

use serde::{Deserialize, Serialize};

/// HTTP listener configuration.
///
/// Controls the plain and TLS listeners, request body handling, and
/// graceful shutdown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Hostname the listeners bind and advertise.
    #[serde(default = "default_host")]
    pub host: String,

    /// Plain HTTP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whether the HTTPS listener is enabled.
    #[serde(default)]
    pub ssl_enabled: bool,

    /// HTTPS port, used when `ssl_enabled` is set.
    #[serde(default = "default_ssl_port")]
    pub ssl_port: u16,

    /// Path to the PEM-encoded TLS certificate.
    #[serde(default = "default_ssl_cert_path")]
    pub ssl_cert_path: String,

    /// Path to the PEM-encoded TLS private key.
    #[serde(default = "default_ssl_key_path")]
    pub ssl_key_path: String,

    /// Path answered by the health-check middleware.
    #[serde(default = "default_health_check_path")]
    pub health_check_path: String,

    /// Seconds to wait for in-flight requests during shutdown.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,

    /// Seconds allowed for reading a request body.
    #[serde(default = "default_body_read_timeout")]
    pub body_read_timeout_secs: u64,

    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl HttpConfig {
    /// The `host:port` address of the plain listener.
    #[must_use]
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The `host:ssl_port` address of the TLS listener.
    #[must_use]
    pub fn https_addr(&self) -> String {
        format!("{}:{}", self.host, self.ssl_port)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ssl_enabled: false,
            ssl_port: default_ssl_port(),
            ssl_cert_path: default_ssl_cert_path(),
            ssl_key_path: default_ssl_key_path(),
            health_check_path: default_health_check_path(),
            shutdown_grace_secs: default_shutdown_grace(),
            body_read_timeout_secs: default_body_read_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_ssl_port() -> u16 {
    3443
}

fn default_ssl_cert_path() -> String {
    "configs/ssl/server.crt".to_string()
}

fn default_ssl_key_path() -> String {
    "configs/ssl/server.key".to_string()
}

fn default_health_check_path() -> String {
    "/health".to_string()
}

fn default_shutdown_grace() -> u64 {
    30
}

fn default_body_read_timeout() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    8 * 1024 * 1024
}

/// CSRF protection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CsrfConfig {
    /// Name of the cookie carrying the CSRF token.
    #[serde(default = "default_csrf_cookie")]
    pub cookie_name: String,

    /// Request header checked against the cookie token.
    #[serde(default = "default_csrf_header")]
    pub header_name: String,

    /// Form field checked against the cookie token.
    #[serde(default = "default_csrf_field")]
    pub field_name: String,

    /// Token lifetime in seconds.
    #[serde(default = "default_csrf_ttl")]
    pub ttl_secs: u64,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_csrf_cookie(),
            header_name: default_csrf_header(),
            field_name: default_csrf_field(),
            ttl_secs: default_csrf_ttl(),
        }
    }
}

fn default_csrf_cookie() -> String {
    "_csrf_token".to_string()
}

fn default_csrf_header() -> String {
    "x-csrf-token".to_string()
}

fn default_csrf_field() -> String {
    "authenticity_token".to_string()
}

fn default_csrf_ttl() -> u64 {
    86_400
}

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Name of the session cookie.
    #[serde(default = "default_session_cookie")]
    pub cookie_name: String,

    /// Idle expiry in seconds; touched on each request.
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_session_cookie(),
            ttl_secs: default_session_ttl(),
        }
    }
}

fn default_session_cookie() -> String {
    "_session_id".to_string()
}

fn default_session_ttl() -> u64 {
    1200
}

/// CORS configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Origins allowed to make cross-site requests. `*` allows any.
    #[serde(default = "default_cors_origins")]
    pub allowed_origins: Vec<String>,

    /// Methods advertised in preflight responses.
    #[serde(default = "default_cors_methods")]
    pub allowed_methods: Vec<String>,

    /// Headers advertised in preflight responses.
    #[serde(default = "default_cors_headers")]
    pub allowed_headers: Vec<String>,

    /// Preflight cache lifetime in seconds.
    #[serde(default = "default_cors_max_age")]
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_cors_origins(),
            allowed_methods: default_cors_methods(),
            allowed_headers: default_cors_headers(),
            max_age_secs: default_cors_max_age(),
        }
    }
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_cors_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_cors_headers() -> Vec<String> {
    ["content-type", "authorization", "x-csrf-token", "x-request-id"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_cors_max_age() -> u64 {
    86_400
}

/// GraphQL mount configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GqlConfig {
    /// Whether the playground page is served.
    #[serde(default = "default_true")]
    pub playground_enabled: bool,

    /// Path of the playground page.
    #[serde(default = "default_playground_path")]
    pub playground_path: String,
}

impl Default for GqlConfig {
    fn default() -> Self {
        Self {
            playground_enabled: true,
            playground_path: default_playground_path(),
        }
    }
}

fn default_playground_path() -> String {
    "/graphiql".to_string()
}

/// Single-page-app proxy configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SpaConfig {
    /// Upstream base URL requests are proxied to, e.g.
    /// `http://localhost:8080`. Unset means the SPA routes answer 502.
    #[serde(default)]
    pub upstream: Option<String>,

    /// Seconds before a proxied request is abandoned.
    #[serde(default = "default_spa_timeout")]
    pub timeout_secs: u64,
}

impl Default for SpaConfig {
    fn default() -> Self {
        Self {
            upstream: None,
            timeout_secs: default_spa_timeout(),
        }
    }
}

fn default_spa_timeout() -> u64 {
    10
}

/// Locale negotiation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct I18nConfig {
    /// Locale used when negotiation finds no match.
    #[serde(default = "default_locale")]
    pub default_locale: String,

    /// Locales the application supports, in preference order.
    #[serde(default = "default_locales")]
    pub locales: Vec<String>,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            default_locale: default_locale(),
            locales: default_locales(),
        }
    }
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_locales() -> Vec<String> {
    vec!["en".to_string()]
}

/// Static asset serving configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AssetConfig {
    /// URL prefix under which assets are served.
    #[serde(default = "default_asset_prefix")]
    pub public_prefix: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            public_prefix: default_asset_prefix(),
        }
    }
}

fn default_asset_prefix() -> String {
    "/assets".to_string()
}

fn default_true() -> bool {
    true
}
