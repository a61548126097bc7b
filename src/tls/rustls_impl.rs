use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tracing::debug;

use crate::config::{TlsOptions, VerifyMode};
use crate::error::{Error, Result};

/// Client-side TLS stream.
pub type TlsStream<S> = tokio_rustls::client::TlsStream<S>;

fn tls_error(context: &str, err: impl std::fmt::Display) -> Error {
    Error::Tls(format!("{context}: {err}"))
}

/// Accepts every server certificate but still checks handshake signatures,
/// so the session keys are bound to whatever key the server presented.
#[derive(Debug)]
struct NoVerification {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for NoVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Build a rustls client configuration from [`TlsOptions`].
///
/// # Errors
///
/// Returns `Error::Tls` if a PEM file cannot be read or parsed, if only one
/// of `cert_file`/`key_file` is set, or if rustls rejects the material.
pub fn client_config(options: &TlsOptions) -> Result<Arc<ClientConfig>> {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| tls_error("protocol versions", e))?;

    let builder = match options.verify {
        VerifyMode::None => builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerification { provider })),
        VerifyMode::Required => {
            let roots = match &options.ca_file {
                Some(path) => {
                    let mut roots = RootCertStore::empty();
                    for cert in load_certs_from_file(path)? {
                        roots.add(cert).map_err(|e| tls_error("CA certificate", e))?;
                    }
                    roots
                }
                None => RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned()),
            };
            builder.with_root_certificates(roots)
        }
    };

    let config = match (&options.cert_file, &options.key_file) {
        (Some(cert_file), Some(key_file)) => builder
            .with_client_auth_cert(
                load_certs_from_file(cert_file)?,
                load_private_key_from_file(key_file)?,
            )
            .map_err(|e| tls_error("client certificate", e))?,
        (None, None) => builder.with_no_client_auth(),
        _ => {
            return Err(Error::Tls(
                "client certificate and key must be given together".to_string(),
            ));
        }
    };

    Ok(Arc::new(config))
}

/// Run a TLS client handshake over `stream`, using `host` for SNI and name checks.
///
/// # Errors
///
/// Returns `Error::Tls` for configuration problems, an unusable host name,
/// or a failed negotiation.
pub async fn connect<S>(stream: S, host: &str, options: &TlsOptions) -> Result<TlsStream<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let config = client_config(options)?;
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| Error::Tls(format!("invalid DNS name: {host}")))?;

    debug!(host, verify = ?options.verify, "starting TLS handshake");
    tokio_rustls::TlsConnector::from(config)
        .connect(server_name, stream)
        .await
        .map_err(|e| tls_error("handshake", e))
}

/// Load every certificate from a PEM file.
///
/// # Errors
///
/// Returns `Error::Tls` if the file cannot be read or holds no certificate.
pub fn load_certs_from_file(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path).map_err(|e| tls_error(&path.display().to_string(), e))?;
    let mut reader = BufReader::new(file);

    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| tls_error(&path.display().to_string(), e))?;

    if certs.is_empty() {
        return Err(Error::Tls(format!(
            "no certificates found in {}",
            path.display()
        )));
    }

    Ok(certs)
}

/// Load the first PKCS#1, PKCS#8 or SEC1 private key from a PEM file.
///
/// # Errors
///
/// Returns `Error::Tls` if the file cannot be read or holds no key.
pub fn load_private_key_from_file(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file = File::open(path).map_err(|e| tls_error(&path.display().to_string(), e))?;
    let mut reader = BufReader::new(file);

    for item in rustls_pemfile::read_all(&mut reader) {
        match item.map_err(|e| tls_error(&path.display().to_string(), e))? {
            rustls_pemfile::Item::Pkcs1Key(key) => return Ok(PrivateKeyDer::Pkcs1(key)),
            rustls_pemfile::Item::Pkcs8Key(key) => return Ok(PrivateKeyDer::Pkcs8(key)),
            rustls_pemfile::Item::Sec1Key(key) => return Ok(PrivateKeyDer::Sec1(key)),
            _ => continue,
        }
    }

    Err(Error::Tls(format!(
        "no private key found in {}",
        path.display()
    )))
}
