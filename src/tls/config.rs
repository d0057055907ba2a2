use super::{ClientIdentity, TrustPool};
use crate::engine::{Error, Result};
use rustls::{ClientConfig, crypto::CryptoProvider, pki_types::ServerName};
use std::{net::IpAddr, sync::Arc};

/// Build the rustls client configuration for one engine
///
/// Only the anchors in `pool` are trusted; no system or bundled web roots are
/// consulted.
///
/// # Errors
///
/// Returns [`Error::Credential`] if rustls rejects the client identity.
pub fn build_client_config(
    identity: ClientIdentity,
    pool: TrustPool,
    provider: Arc<CryptoProvider>,
) -> Result<ClientConfig> {
    let (chain, key) = identity.into_parts();

    ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Credential(format!("unsupported protocol versions: {e}")))?
        .with_root_certificates(pool.into_root_store())
        .with_client_auth_cert(chain, key)
        .map_err(|e| Error::Credential(e.to_string()))
}

/// Convert the logical server name into the TLS verification target
///
/// # Errors
///
/// Returns [`Error::ServerName`] if `name` is neither a DNS name nor an IP
/// address.
pub fn server_name(name: &str) -> Result<ServerName<'static>> {
    name.parse::<IpAddr>().map_or_else(
        |_| {
            ServerName::try_from(name.to_string()).map_err(|e| Error::ServerName {
                name: name.to_string(),
                reason: e.to_string(),
            })
        },
        |ip| Ok(ServerName::from(ip)),
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::tls::parse_identity;
    use rcgen::{CertificateParams, KeyPair};
    use rustls::crypto::ring::default_provider;

    #[test]
    fn test_server_name_from_hostname() {
        assert!(server_name("example.com").is_ok());
        assert!(server_name("host.internal").is_ok());
        assert!(server_name("db1").is_ok());
    }

    #[test]
    fn test_server_name_from_ip() {
        let name = server_name("192.168.1.100").unwrap();
        assert!(matches!(name, ServerName::IpAddress(_)));

        let name = server_name("2001:db8::1").unwrap();
        assert!(matches!(name, ServerName::IpAddress(_)));
    }

    #[test]
    fn test_server_name_keeps_dns_value() {
        let name = server_name("host.internal").unwrap();
        match name {
            ServerName::DnsName(dns) => assert_eq!(dns.as_ref(), "host.internal"),
            other => panic!("unexpected server name {other:?}"),
        }
    }

    #[test]
    fn test_server_name_invalid() {
        let err = server_name("").unwrap_err();
        assert!(matches!(err, Error::ServerName { .. }));

        let err = server_name("invalid host name with spaces").unwrap_err();
        assert!(err.to_string().contains("invalid host name with spaces"));
    }

    #[test]
    fn test_build_client_config_with_empty_pool() {
        let key = KeyPair::generate().unwrap();
        let cert = CertificateParams::new(vec!["client".to_string()])
            .unwrap()
            .self_signed(&key)
            .unwrap();
        let provider = Arc::new(default_provider());
        let identity =
            parse_identity(cert.pem().as_bytes(), key.serialize_pem().as_bytes(), &provider)
                .unwrap();

        let config = build_client_config(identity, TrustPool::from_pem(b""), provider);
        assert!(config.is_ok());
        assert!(config.unwrap().client_auth_cert_resolver.has_certs());
    }
}
