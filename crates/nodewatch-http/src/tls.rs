//! rustls client configurations.

use std::sync::Arc;

use rustls::ClientConfig;
use rustls::pki_types::CertificateDer;

use crate::error::HttpResult;

/// Client config trusting the Mozilla root store bundled by `webpki-roots`.
pub fn webpki_client_config() -> HttpResult<Arc<ClientConfig>> {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    build(roots)
}

/// Client config trusting only `certs`, for private CAs and self-signed
/// endpoints.
pub fn client_config_with_roots(
    certs: impl IntoIterator<Item = CertificateDer<'static>>,
) -> HttpResult<Arc<ClientConfig>> {
    let mut roots = rustls::RootCertStore::empty();
    for cert in certs {
        roots.add(cert)?;
    }
    build(roots)
}

fn build(roots: rustls::RootCertStore) -> HttpResult<Arc<ClientConfig>> {
    let config =
        ClientConfig::builder_with_provider(rustls::crypto::ring::default_provider().into())
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots)
            .with_no_client_auth();
    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webpki_config_builds() {
        let config = webpki_client_config().unwrap();
        assert!(config.alpn_protocols.is_empty());
    }

    #[test]
    fn garbage_root_is_rejected() {
        let bogus = CertificateDer::from(vec![0u8; 16]);
        assert!(client_config_with_roots([bogus]).is_err());
    }
}
