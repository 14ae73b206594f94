//! TLS context construction from PEM files.
//!
//! The certificate chain and private key are loaded once at startup and
//! shared by every session through the returned acceptor. rustls speaks
//! TLS 1.2/1.3 only and always uses ephemeral key exchange, so no legacy
//! protocol or key-reuse knobs exist to turn off.

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls_pemfile::{certs, private_key};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;

use crate::error::{Error, Result};

/// Build the process-wide TLS acceptor from PEM cert and key files.
pub fn load_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor> {
    let cert_file = File::open(cert_path).map_err(|e| {
        Error::Tls(format!(
            "failed to open certificate {}: {e}",
            cert_path.display()
        ))
    })?;
    let key_file = File::open(key_path).map_err(|e| {
        Error::Tls(format!(
            "failed to open private key {}: {e}",
            key_path.display()
        ))
    })?;

    let cert_chain: Vec<CertificateDer<'static>> = certs(&mut BufReader::new(cert_file))
        .collect::<std::io::Result<_>>()
        .map_err(|e| Error::Tls(format!("invalid certificate: {e}")))?;

    let key: PrivateKeyDer<'static> = private_key(&mut BufReader::new(key_file))
        .map_err(|e| Error::Tls(format!("invalid private key: {e}")))?
        .ok_or_else(|| Error::Tls(format!("no private key found in {}", key_path.display())))?;

    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(cert_chain, key)
        .map_err(|e| Error::Tls(e.to_string()))?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}
