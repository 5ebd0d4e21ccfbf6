//! The standard middleware stages.
//!
//! [`crate::default_stack`] registers these in a fixed order:
//!
//! 1. [`recovery`] - panic → 500
//! 2. [`request_id`] - correlation IDs
//! 3. [`real_ip`] - client address resolution
//! 4. [`request_logger`] - one log line per request
//! 5. [`health_check`] - load balancer probes
//! 6. [`body_limit`] - request size cap
//! 7. [`cors`] - origin allow-list
//! 8. [`secure_headers`] - browser hardening headers
//! 9. [`session`] - cookie-identified server-side state
//! 10. [`csrf`] - double-submit token check
//! 11. [`i18n`] - locale negotiation
//! 12. [`api_only`] - cookie stripping for API clients
//! 13. [`compression`] - response gzip
//! 14. [`header_filter`] - response header removal
//! 15. [`static_assets`] - asset serving with routing fallthrough
//!
//! Every stage is an ordinary [`portico_core::Handler`] and can also be
//! registered individually on a route or group.

pub mod api_only;
pub mod body_limit;
pub mod compression;
pub mod cors;
pub mod csrf;
pub mod header_filter;
pub mod health_check;
pub mod i18n;
pub mod real_ip;
pub mod recovery;
pub mod request_id;
pub mod request_logger;
pub mod secure_headers;
pub mod session;
pub mod static_assets;

// Re-export main types
pub use api_only::ApiOnly;
pub use body_limit::BodyLimit;
pub use compression::Compressor;
pub use cors::Cors;
pub use csrf::Csrf;
pub use header_filter::HeaderFilter;
pub use health_check::HealthCheck;
pub use i18n::I18nLocale;
pub use real_ip::RealIp;
pub use recovery::Recovery;
pub use request_id::RequestId;
pub use request_logger::RequestLogger;
pub use secure_headers::SecureHeaders;
pub use session::{Session, SessionStore};
pub use static_assets::StaticAssets;
