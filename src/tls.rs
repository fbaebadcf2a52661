//! TLS configuration for both services.
//!
//! ## Flow Overview
//! 1) Read the PEM-encoded certificate chain and private key from the configured paths.
//! 2) Build a rustls server config with no client auth, advertising `h2` and `http/1.1`.
//!
//! Security boundary: the services refuse to start without valid TLS material.

use anyhow::{Context, Result, anyhow};
use rustls::ServerConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls_pemfile::{certs, private_key};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    cert: PathBuf,
    key: PathBuf,
}

impl TlsPaths {
    #[must_use]
    pub fn new(cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        Self {
            cert: cert.into(),
            key: key.into(),
        }
    }

    #[must_use]
    pub fn cert_path(&self) -> &Path {
        &self.cert
    }

    #[must_use]
    pub fn key_path(&self) -> &Path {
        &self.key
    }
}

/// Load the TLS server configuration.
///
/// # Errors
/// Returns an error if the certificate chain or key cannot be read or parsed.
pub fn load_server_config(paths: &TlsPaths) -> Result<ServerConfig> {
    let cert_chain = load_cert_chain(paths.cert_path())?;
    let key = load_private_key(paths.key_path())?;

    let mut config =
        ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .context("Failed to select TLS protocol versions")?
            .with_no_client_auth()
            .with_single_cert(cert_chain, key)
            .context("Failed to build TLS server config")?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(config)
}

fn load_cert_chain(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open TLS certificate: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let certs = certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read TLS certificate: {}", path.display()))?;
    if certs.is_empty() {
        return Err(anyhow!("TLS certificate is empty: {}", path.display()));
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open TLS key: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    // PKCS#8, PKCS#1 and SEC1 keys are all accepted; the first one wins.
    private_key(&mut reader)
        .with_context(|| format!("Failed to read TLS key: {}", path.display()))?
        .ok_or_else(|| anyhow!("TLS private key not found: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_self_signed(dir: &TempDir) -> Result<TlsPaths> {
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])?;
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");
        fs::write(&cert, certified.cert.pem())?;
        fs::write(&key, certified.key_pair.serialize_pem())?;
        Ok(TlsPaths::new(cert, key))
    }

    #[test]
    fn load_server_config_from_generated_files() -> Result<()> {
        let dir = TempDir::new()?;
        let paths = write_self_signed(&dir)?;
        let config = load_server_config(&paths)?;
        assert_eq!(
            config.alpn_protocols,
            vec![b"h2".to_vec(), b"http/1.1".to_vec()]
        );
        Ok(())
    }

    #[test]
    fn missing_files_fail() -> Result<()> {
        let dir = TempDir::new()?;
        let paths = TlsPaths::new(dir.path().join("cert.pem"), dir.path().join("key.pem"));
        let err = load_server_config(&paths).err().map(|err| format!("{err:#}"));
        assert!(err.is_some_and(|err| err.contains("Failed to open TLS certificate")));
        Ok(())
    }

    #[test]
    fn empty_certificate_fails() -> Result<()> {
        let dir = TempDir::new()?;
        let generated = write_self_signed(&dir)?;
        fs::write(generated.cert_path(), "")?;
        let err = load_server_config(&generated).err().map(|err| format!("{err:#}"));
        assert!(err.is_some_and(|err| err.contains("TLS certificate is empty")));
        Ok(())
    }

    #[test]
    fn certificate_without_key_fails() -> Result<()> {
        let dir = TempDir::new()?;
        let generated = write_self_signed(&dir)?;
        // a certificate is not a key
        let paths = TlsPaths::new(generated.cert_path(), generated.cert_path());
        assert!(load_server_config(&paths).is_err());
        Ok(())
    }
}
