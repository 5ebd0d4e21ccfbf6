//! TLS acceptor construction from PEM certificate and key files.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;

use crate::error::{ServerError, ServerResult};

/// Returns true when both the certificate and key files exist on disk.
#[must_use]
pub fn cert_files_exist(cert_path: &Path, key_path: &Path) -> bool {
    cert_path.is_file() && key_path.is_file()
}

/// Builds a TLS acceptor from PEM-encoded certificate chain and private
/// key files.
///
/// Only HTTP/1.1 is negotiated over ALPN.
pub fn build_acceptor(cert_path: &Path, key_path: &Path) -> ServerResult<TlsAcceptor> {
    let certs = load_certs(cert_path)?;
    if certs.is_empty() {
        return Err(ServerError::tls(format!(
            "no certificates found in {}",
            cert_path.display()
        )));
    }
    let key = load_private_key(key_path)?;

    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|err| ServerError::tls(format!("invalid certificate or key: {err}")))?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn load_certs(path: &Path) -> ServerResult<Vec<CertificateDer<'static>>> {
    let file = File::open(path)
        .map_err(|err| ServerError::tls(format!("cannot open {}: {err}", path.display())))?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| ServerError::tls(format!("cannot parse {}: {err}", path.display())))
}

fn load_private_key(path: &Path) -> ServerResult<PrivateKeyDer<'static>> {
    let file = File::open(path)
        .map_err(|err| ServerError::tls(format!("cannot open {}: {err}", path.display())))?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|err| ServerError::tls(format!("cannot parse {}: {err}", path.display())))?
        .ok_or_else(|| {
            ServerError::tls(format!("no private key found in {}", path.display()))
        })
}
