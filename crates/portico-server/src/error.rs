//! Server error types.

use thiserror::Error;

/// Convenience alias for server results.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors raised while starting or running a server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding a listener failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that could not be bound.
        addr: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Building the TLS acceptor failed.
    #[error("tls setup failed: {0}")]
    TlsSetup(String),

    /// SSL is enabled but the certificate files are not on disk.
    #[error("missing tls certificate: cert {cert_path}, key {key_path}")]
    MissingCertificate {
        /// Configured certificate path.
        cert_path: String,
        /// Configured private key path.
        key_path: String,
    },

    /// Building the upstream proxy client failed.
    #[error("proxy client setup failed: {0}")]
    ProxySetup(String),

    /// IO error during server operation.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Creates a [`ServerError::Bind`] error.
    pub fn bind(addr: impl Into<String>, source: std::io::Error) -> Self {
        Self::Bind {
            addr: addr.into(),
            source,
        }
    }

    /// Creates a [`ServerError::TlsSetup`] error.
    pub fn tls(message: impl Into<String>) -> Self {
        Self::TlsSetup(message.into())
    }

    /// Creates a [`ServerError::MissingCertificate`] error.
    pub fn missing_certificate(
        cert_path: impl Into<String>,
        key_path: impl Into<String>,
    ) -> Self {
        Self::MissingCertificate {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        }
    }

    /// Creates a [`ServerError::ProxySetup`] error.
    pub fn proxy(message: impl Into<String>) -> Self {
        Self::ProxySetup(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ServerError::bind(
            "localhost:3000",
            std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
        );
        assert!(err.to_string().contains("failed to bind localhost:3000"));

        let err = ServerError::missing_certificate("configs/ssl/server.crt", "configs/ssl/server.key");
        assert!(err.to_string().contains("configs/ssl/server.crt"));
        assert!(err.to_string().contains("configs/ssl/server.key"));

        let err = ServerError::tls("no certificates found");
        assert_eq!(err.to_string(), "tls setup failed: no certificates found");
    }
}
