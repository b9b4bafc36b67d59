//! TLS connector setup for the hyper transport.
//!
//! TLS needs both a crypto provider and root certificates:
//!
//! - **Crypto providers**: `tls-ring` (default with `tls`) or `tls-aws-lc`.
//!   Without either, a process-wide default installed through
//!   `CryptoProvider::install_default()` is used.
//! - **Root certificates**: `tls-native-roots` (default with `tls`) or
//!   `tls-webpki-roots`.
//!
//! Every function here reports a missing provider or missing roots as a
//! [`ClientBuildError::Tls`].

use std::sync::Arc;

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::ClientConfig;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};

use crate::error::ClientBuildError;

/// Select the crypto provider: feature-gated first, then the process default.
fn crypto_provider() -> Result<Arc<CryptoProvider>, ClientBuildError> {
    #[cfg(feature = "tls-ring")]
    return Ok(Arc::new(rustls::crypto::ring::default_provider()));

    #[cfg(all(feature = "tls-aws-lc", not(feature = "tls-ring")))]
    return Ok(Arc::new(rustls::crypto::aws_lc_rs::default_provider()));

    #[cfg(not(any(feature = "tls-ring", feature = "tls-aws-lc")))]
    CryptoProvider::get_default().cloned().ok_or_else(|| {
        ClientBuildError::Tls(
            "no crypto provider: enable `tls-ring` or `tls-aws-lc`, \
             or install a process default"
                .to_string(),
        )
    })
}

fn config_builder(
    provider: Arc<CryptoProvider>,
) -> Result<rustls::ConfigBuilder<ClientConfig, rustls::WantsVerifier>, ClientBuildError> {
    ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ClientBuildError::Tls(e.to_string()))
}

/// Build the default TLS configuration from the enabled root features.
#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
pub fn default_tls_config() -> Result<ClientConfig, ClientBuildError> {
    let builder = config_builder(crypto_provider()?)?;
    Ok(builder
        .with_root_certificates(build_root_store())
        .with_no_client_auth())
}

/// Native roots win when both root features are enabled.
#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
fn build_root_store() -> rustls::RootCertStore {
    let mut roots = rustls::RootCertStore::empty();

    #[cfg(feature = "tls-native-roots")]
    {
        let native_certs = rustls_native_certs::load_native_certs();
        if !native_certs.errors.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::debug!("errors loading native certs: {:?}", native_certs.errors);
        }
        let (added, ignored) = roots.add_parsable_certificates(native_certs.certs);
        #[cfg(feature = "tracing")]
        tracing::debug!(added, ignored, "loaded native root certificates");
        #[cfg(not(feature = "tracing"))]
        let _ = (added, ignored);
    }

    #[cfg(all(feature = "tls-webpki-roots", not(feature = "tls-native-roots")))]
    {
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    roots
}

/// Build an HTTPS connector that also accepts plain `http://` URLs.
///
/// Without an explicit `tls_config`, [`default_tls_config`] is used.
pub fn build_https_connector(
    tls_config: Option<ClientConfig>,
) -> Result<HttpsConnector<HttpConnector>, ClientBuildError> {
    let config = match tls_config {
        Some(config) => config,
        None => {
            #[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
            {
                default_tls_config()?
            }

            #[cfg(not(any(feature = "tls-native-roots", feature = "tls-webpki-roots")))]
            {
                return Err(ClientBuildError::Tls(
                    "no root certificates: enable `tls-native-roots` or \
                     `tls-webpki-roots`, or pass a TLS config"
                        .to_string(),
                ));
            }
        }
    };

    Ok(HttpsConnectorBuilder::new()
        .with_tls_config(config)
        .https_or_http()
        .enable_all_versions()
        .build())
}

/// A verifier that skips certificate chain and hostname checks.
///
/// Handshake signatures are still checked with the provider's algorithms.
/// Use only against development proxies with self-signed certificates.
#[derive(Debug)]
pub struct DangerousAcceptAnyCertVerifier {
    provider: Arc<CryptoProvider>,
}

impl DangerousAcceptAnyCertVerifier {
    pub fn new(provider: Arc<CryptoProvider>) -> Self {
        Self { provider }
    }
}

impl ServerCertVerifier for DangerousAcceptAnyCertVerifier {
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
        dss: &rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
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
        dss: &rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// TLS config that accepts any server certificate.
pub fn danger_accept_invalid_certs_config() -> Result<ClientConfig, ClientBuildError> {
    let provider = crypto_provider()?;
    let verifier = Arc::new(DangerousAcceptAnyCertVerifier::new(provider.clone()));
    Ok(config_builder(provider)?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(all(
        any(feature = "tls-ring", feature = "tls-aws-lc"),
        any(feature = "tls-native-roots", feature = "tls-webpki-roots")
    ))]
    #[test]
    fn test_default_tls_config() {
        let config = default_tls_config().unwrap();
        assert!(config.alpn_protocols.is_empty());
        assert!(build_https_connector(None).is_ok());
    }

    #[cfg(any(feature = "tls-ring", feature = "tls-aws-lc"))]
    #[test]
    fn test_danger_config_builds() {
        let config = danger_accept_invalid_certs_config().unwrap();
        assert!(build_https_connector(Some(config)).is_ok());
    }
}
