//! TLS client configuration for the Proxmox API.
//!
//! Proxmox clusters usually serve a certificate signed by their own
//! cluster CA (`/etc/pve/pve-root-ca.pem`), which is trusted through an
//! explicit PEM bundle. Without a bundle the Mozilla roots apply, which
//! covers ACME certificates. Verification can be switched off for lab
//! clusters with self-signed certificates.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use distributor_core::{ClusterError, ClusterResult, ProxmoxSettings};

/// Build the TLS connector described by `settings`.
pub fn connector(settings: &ProxmoxSettings) -> ClusterResult<TlsConnector> {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .map_err(|e| ClusterError::Config(e.to_string()))?;

    let config = if settings.verify_tls {
        let roots = match settings.ca_certificate.as_deref() {
            Some(path) => {
                let roots = load_roots(path)?;
                debug!(path = %path.display(), roots = roots.len(), "loaded Proxmox CA bundle");
                roots
            }
            None => web_pki_roots(),
        };
        builder.with_root_certificates(roots).with_no_client_auth()
    } else {
        warn!(host = %settings.host, "TLS certificate verification disabled");
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate(provider)))
            .with_no_client_auth()
    };

    Ok(TlsConnector::from(Arc::new(config)))
}

/// Mozilla's root store, for clusters with publicly trusted certificates.
fn web_pki_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    roots
}

/// Read every certificate in a PEM bundle into a root store.
fn load_roots(path: &Path) -> ClusterResult<RootCertStore> {
    let file = File::open(path)
        .map_err(|e| ClusterError::Config(format!("{}: {e}", path.display())))?;
    let mut reader = BufReader::new(file);

    let mut roots = RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut reader) {
        let cert = cert.map_err(|e| ClusterError::Config(format!("{}: {e}", path.display())))?;
        roots
            .add(cert)
            .map_err(|e| ClusterError::Config(format!("{}: {e}", path.display())))?;
    }

    if roots.is_empty() {
        return Err(ClusterError::Config(format!(
            "{}: no certificates found",
            path.display()
        )));
    }
    Ok(roots)
}

/// Accepts any server certificate; handshake signatures are still checked.
#[derive(Debug)]
struct AcceptAnyCertificate(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use distributor_core::{Credentials, Scheme};
    use std::path::PathBuf;

    fn settings(verify_tls: bool, ca_certificate: Option<PathBuf>) -> ProxmoxSettings {
        ProxmoxSettings {
            host: "pve01.example.com".to_string(),
            scheme: Scheme::Https,
            verify_tls,
            ca_certificate,
            timeout_secs: 10,
            credentials: Credentials::Token {
                token_id: "monitor@pve!probe".to_string(),
                secret: "secret".to_string(),
            },
        }
    }

    fn write_ca(dir: &Path) -> PathBuf {
        let key = rcgen::KeyPair::generate().unwrap();
        let mut params = rcgen::CertificateParams::new(vec!["pve01.example.com".to_string()]).unwrap();
        params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        let cert = params.self_signed(&key).unwrap();

        let path = dir.join("pve-root-ca.pem");
        std::fs::write(&path, cert.pem()).unwrap();
        path
    }

    #[test]
    fn verified_connector_loads_ca_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let ca = write_ca(dir.path());

        assert_eq!(load_roots(&ca).unwrap().len(), 1);
        assert!(connector(&settings(true, Some(ca))).is_ok());
    }

    #[test]
    fn verification_without_ca_uses_web_pki_roots() {
        assert!(!web_pki_roots().is_empty());
        assert!(connector(&settings(true, None)).is_ok());
    }

    #[test]
    fn minimal_config_builds_a_verified_connector() {
        let settings: distributor_core::Settings = toml::from_str(
            r#"
[proxmox]
host = "pve.example.com"

[proxmox.credentials]
token_id = "monitor@pve!probe"
secret = "00000000-0000-0000-0000-000000000000"
"#,
        )
        .unwrap();
        let proxmox = settings.proxmox().unwrap();
        assert!(proxmox.verify_tls);
        assert!(proxmox.ca_certificate.is_none());
        assert!(connector(proxmox).is_ok());
    }

    #[test]
    fn ca_bundle_without_certificates_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pem");
        std::fs::write(&path, "not a certificate\n").unwrap();

        assert!(matches!(load_roots(&path), Err(ClusterError::Config(_))));
    }

    #[test]
    fn missing_ca_bundle_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_roots(&dir.path().join("missing.pem")),
            Err(ClusterError::Config(_))
        ));
    }

    #[test]
    fn unverified_connector_needs_no_ca() {
        assert!(connector(&settings(false, None)).is_ok());
    }
}
