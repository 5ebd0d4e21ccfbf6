//! Typed configuration system for Portico.
//!
//! This crate provides a strongly-typed configuration system for Portico
//! servers with support for:
//! - Environment presets (`development`, `test`, `production`)
//! - TOML configuration files
//! - `.env` files sourced per environment
//! - Environment variable overrides for the common scalar fields
//! - Strict validation (fails on unknown fields)
//!
//! # Overview
//!
//! The configuration system is built around the [`AppConfig`] struct,
//! which contains all the configuration options for a Portico server:
//!
//! - [`HttpConfig`] - listener settings (host, ports, SSL paths, limits)
//! - [`CsrfConfig`] / [`SessionConfig`] / [`CorsConfig`] - middleware settings
//! - [`GqlConfig`] - GraphQL mount settings
//! - [`SpaConfig`] - SPA reverse proxy settings
//! - [`I18nConfig`] / [`AssetConfig`] - locale and static asset settings
//!
//! # Example
//!
//! ```no_run
//! use portico_config::AppConfig;
//!
//! # fn main() -> Result<(), portico_config::ConfigError> {
//! let config = AppConfig::load_for("development")?;
//! println!("listening on {}", config.http.http_addr());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! A `configs/<environment>.toml` file overlays the preset:
//!
//! ```toml
//! [http]
//! host = "0.0.0.0"
//! port = 8080
//! ssl_enabled = true
//! ssl_port = 8443
//!
//! [gql]
//! playground_enabled = false
//!
//! [spa]
//! upstream = "http://localhost:5173"
//! ```
//!
//! # Environment Variable Overrides
//!
//! The scalar listener fields can be overridden without a file:
//!
//! - `PORTICO_HTTP_HOST=0.0.0.0`
//! - `PORTICO_HTTP_PORT=9000`
//! - `PORTICO_HTTP_SSL_ENABLED=true`
//! - `PORTICO_SPA_UPSTREAM=http://localhost:5173`

#![warn(missing_docs)]

mod app;
mod error;
mod schema;

pub use app::AppConfig;
pub use error::ConfigError;
pub use schema::{
    AssetConfig, CorsConfig, CsrfConfig, GqlConfig, HttpConfig, I18nConfig, SessionConfig,
    SpaConfig,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.http.http_addr(), "localhost:3000");
        assert_eq!(config.http.shutdown_grace_secs, 30);
    }

    #[test]
    fn test_presets_differ_only_where_intended() {
        let dev = AppConfig::development();
        let prod = AppConfig::production();
        assert_eq!(dev.http, prod.http);
        assert_ne!(dev.gql.playground_enabled, prod.gql.playground_enabled);
    }
}
