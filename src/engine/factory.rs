use super::{ClientOptions, EngineApi, EngineClient, EngineConnector, Error, Result};
use crate::{
    server::Server,
    tls::{CertMetadata, TrustPool, build_client_config, parse_identity, server_name},
};
use bytes::Bytes;
use http::Uri;
use http_body_util::Full;
use hyper_util::{
    client::legacy::Client,
    rt::{TokioExecutor, TokioTimer},
};
use rustls::crypto::{CryptoProvider, ring};
use std::{net::Ipv6Addr, sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Idle pooled connections are closed after this long
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Client certificates closer than this to expiry are logged at warn level
const CERT_EXPIRY_WARN_DAYS: i64 = 30;

/// Turns a server descriptor into a ready-to-use engine client
///
/// Orchestration code depends on this trait rather than on
/// [`TlsClientFactory`], so tests can hand out fake clients without
/// certificates or network access.
pub trait ClientFactory: Send + Sync {
    type Client: EngineApi + 'static;

    /// Build a client for `server`
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor cannot produce a working client.
    fn build(&self, server: &Server) -> Result<Self::Client>;
}

/// Builds mutually authenticated engine clients with rustls
#[derive(Debug, Clone)]
pub struct TlsClientFactory {
    options: ClientOptions,
    provider: Arc<CryptoProvider>,
}

impl Default for TlsClientFactory {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}

impl TlsClientFactory {
    #[must_use]
    pub fn new(options: ClientOptions) -> Self {
        Self {
            options,
            provider: Arc::new(ring::default_provider()),
        }
    }

    #[must_use]
    pub const fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Build a concrete [`EngineClient`]
    ///
    /// Pure configuration assembly: no file is read and no connection is
    /// opened, TLS and network failures surface on first use.
    ///
    /// # Errors
    ///
    /// - [`Error::Credential`] if the client certificate or key is malformed or
    ///   they do not match
    /// - [`Error::TrustConfiguration`] if the CA bundle holds no usable
    ///   certificate and empty pools are not allowed
    /// - [`Error::ServerName`] / [`Error::Endpoint`] if the name or address
    ///   cannot be used
    pub fn build_client(&self, server: &Server) -> Result<EngineClient> {
        let identity = parse_identity(&server.tls_cert, &server.tls_key, &self.provider)?;
        let client_certificate = identity
            .leaf()
            .and_then(|leaf| CertMetadata::from_der(leaf.as_ref()));
        if let Some(days) = client_certificate.as_ref().and_then(|m| m.expiry_days)
            && days < CERT_EXPIRY_WARN_DAYS
        {
            warn!(server = %server.name, expiry_days = days, "client certificate expires soon");
        }

        let pool = TrustPool::from_pem(&server.ca_cert);
        if pool.ignored() > 0 {
            debug!(server = %server.name, ignored = pool.ignored(), "skipped unusable CA certificates");
        }
        let trust_anchors = pool.anchors();
        if pool.is_empty() {
            if !self.options.allow_empty_trust_pool {
                return Err(Error::TrustConfiguration(format!(
                    "CA bundle for {} contains no usable certificate",
                    server.name
                )));
            }
            warn!(server = %server.name, "empty trust pool, every engine certificate will be rejected");
        }

        // the engine certificate must match the logical name, not the address
        let tls_name = server_name(&server.name)?;
        let endpoint = endpoint(&server.address, self.options.port)?;

        let config = build_client_config(identity, pool, Arc::clone(&self.provider))?;
        let connector = EngineConnector::new(Arc::new(config), tls_name, &self.options.timeouts);

        let http = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .pool_timer(TokioTimer::new())
            .build::<_, Full<Bytes>>(connector);

        debug!(
            server = %server.name,
            endpoint = %endpoint,
            api_version = %self.options.api_version,
            trust_anchors,
            "engine client ready"
        );

        Ok(EngineClient::new(
            http,
            endpoint,
            server.name.clone(),
            self.options.api_version.clone(),
            self.options.timeouts,
            trust_anchors,
            client_certificate,
        ))
    }
}

impl ClientFactory for TlsClientFactory {
    type Client = EngineClient;

    fn build(&self, server: &Server) -> Result<EngineClient> {
        self.build_client(server)
    }
}

/// Compose `https://<address>:<port>`, bracketing IPv6 literals
///
/// # Errors
///
/// Returns [`Error::Endpoint`] if the result is not a valid URI.
pub fn endpoint(address: &str, port: u16) -> Result<String> {
    let host = if address.parse::<Ipv6Addr>().is_ok() {
        format!("[{address}]")
    } else {
        address.to_string()
    };
    let endpoint = format!("https://{host}:{port}");

    match endpoint.parse::<Uri>() {
        Ok(uri) if uri.host().is_some_and(|h| !h.is_empty()) => Ok(endpoint),
        _ => Err(Error::Endpoint(endpoint)),
    }
}
