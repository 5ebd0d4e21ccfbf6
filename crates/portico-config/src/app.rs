//! Root application configuration.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::schema::{
    AssetConfig, CorsConfig, CsrfConfig, GqlConfig, HttpConfig, I18nConfig, SessionConfig,
    SpaConfig,
};

/// The complete application configuration.
///
/// Comes from an environment preset or an optional TOML file, with
/// `PORTICO_*` environment variable overrides for the common scalar
/// fields applied on top.
///
/// # Example
///
/// ```
/// use portico_config::AppConfig;
///
/// let config = AppConfig::development();
/// assert_eq!(config.http.port, 3000);
/// assert_eq!(config.environment, "development");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Environment name: `development`, `test`, or `production`.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Path of the environment file this configuration was loaded with,
    /// shown in the startup banner.
    #[serde(default = "default_config_path")]
    pub config_path: String,

    /// HTTP listener settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// CSRF protection settings.
    #[serde(default)]
    pub csrf: CsrfConfig,

    /// Session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// CORS settings.
    #[serde(default)]
    pub cors: CorsConfig,

    /// GraphQL mount settings.
    #[serde(default)]
    pub gql: GqlConfig,

    /// SPA proxy settings.
    #[serde(default)]
    pub spa: SpaConfig,

    /// Locale negotiation settings.
    #[serde(default)]
    pub i18n: I18nConfig,

    /// Static asset settings.
    #[serde(default)]
    pub assets: AssetConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl AppConfig {
    /// The development preset: playground on, everything local.
    #[must_use]
    pub fn development() -> Self {
        Self {
            environment: "development".to_string(),
            config_path: "configs/.env.development".to_string(),
            http: HttpConfig::default(),
            csrf: CsrfConfig::default(),
            session: SessionConfig::default(),
            cors: CorsConfig::default(),
            gql: GqlConfig::default(),
            spa: SpaConfig::default(),
            i18n: I18nConfig::default(),
            assets: AssetConfig::default(),
        }
    }

    /// The test preset.
    #[must_use]
    pub fn test() -> Self {
        let mut config = Self::development();
        config.environment = "test".to_string();
        config.config_path = "configs/.env.test".to_string();
        config
    }

    /// The production preset: playground off.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = "production".to_string();
        config.config_path = "configs/.env.production".to_string();
        config.gql.playground_enabled = false;
        config
    }

    /// Whether this configuration runs in development mode.
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Loads configuration for the environment named by `PORTICO_ENV`
    /// (default `development`).
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            env::var("PORTICO_ENV").unwrap_or_else(|_| "development".to_string());
        Self::load_for(&environment)
    }

    /// Loads configuration for a named environment.
    ///
    /// A `configs/.env.<env>` file, when present, is sourced into the
    /// process environment first. A `configs/<env>.toml` file, when
    /// present, defines the configuration (missing fields fall back to
    /// schema defaults); otherwise the environment preset applies.
    /// `PORTICO_*` environment overrides win in either case.
    pub fn load_for(environment: &str) -> Result<Self, ConfigError> {
        let env_path = format!("configs/.env.{environment}");
        if Path::new(&env_path).exists() {
            dotenvy::from_path(&env_path)
                .map_err(|e| ConfigError::env_file(env_path.clone(), e))?;
        }

        let mut config = match environment {
            "production" => Self::production(),
            "test" => Self::test(),
            _ => Self::development(),
        };

        let toml_path = format!("configs/{environment}.toml");
        if Path::new(&toml_path).exists() {
            let content = fs::read_to_string(&toml_path)
                .map_err(|e| ConfigError::read_error(toml_path.clone(), e))?;
            config = Self::from_toml_str(&content)?;
        }

        config.environment = environment.to_string();
        config.config_path = env_path;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a configuration from a TOML document; missing fields fall
    /// back to defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Applies scalar overrides from a key lookup. Split out from the
    /// process environment so it can be exercised deterministically.
    pub fn apply_overrides(
        &mut self,
        get: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = get("PORTICO_HTTP_HOST") {
            self.http.host = value;
        }
        if let Some(value) = get("PORTICO_HTTP_PORT") {
            self.http.port = parse_var("PORTICO_HTTP_PORT", &value, "expected port number")?;
        }
        if let Some(value) = get("PORTICO_HTTP_SSL_ENABLED") {
            self.http.ssl_enabled =
                parse_var("PORTICO_HTTP_SSL_ENABLED", &value, "expected true or false")?;
        }
        if let Some(value) = get("PORTICO_HTTP_SSL_PORT") {
            self.http.ssl_port =
                parse_var("PORTICO_HTTP_SSL_PORT", &value, "expected port number")?;
        }
        if let Some(value) = get("PORTICO_HTTP_SSL_CERT_PATH") {
            self.http.ssl_cert_path = value;
        }
        if let Some(value) = get("PORTICO_HTTP_SSL_KEY_PATH") {
            self.http.ssl_key_path = value;
        }
        if let Some(value) = get("PORTICO_SPA_UPSTREAM") {
            self.spa.upstream = Some(value);
        }
        Ok(())
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.ssl_enabled {
            if self.http.ssl_cert_path.is_empty() || self.http.ssl_key_path.is_empty() {
                return Err(ConfigError::validation_error(
                    "ssl_cert_path and ssl_key_path must be set when SSL is enabled",
                ));
            }
            if self.http.port == self.http.ssl_port {
                return Err(ConfigError::validation_error(
                    "port and ssl_port must differ when SSL is enabled",
                ));
            }
        }
        if self.i18n.locales.is_empty() {
            return Err(ConfigError::validation_error(
                "i18n.locales must not be empty",
            ));
        }
        if self.http.max_body_bytes == 0 {
            return Err(ConfigError::validation_error(
                "http.max_body_bytes must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    var: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::env_parse_error(var, reason))
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_config_path() -> String {
    "configs/.env.development".to_string()
}
