use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
};

/// A remote Docker engine and the credentials used to reach it
///
/// `name` is the identity the engine certificate must carry, `address` is only
/// used to route the connection. They may differ (load balancers, floating IPs).
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Server {
    /// Logical name, used as the TLS server name
    pub name: String,
    /// Network host (DNS name or IP literal)
    pub address: String,
    /// PEM client certificate chain, leaf first
    pub tls_cert: Vec<u8>,
    /// PEM client private key
    pub tls_key: Vec<u8>,
    /// PEM CA bundle trusted to sign the engine certificate
    pub ca_cert: Vec<u8>,
}

impl Server {
    /// Digest of the routing and credential material
    ///
    /// Two descriptors with the same fingerprint produce equivalent handles, so
    /// callers caching handles per server can detect rotated credentials
    /// without keeping a copy of the key.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.address.hash(&mut hasher);
        self.tls_cert.hash(&mut hasher);
        self.tls_key.hash(&mut hasher);
        self.ca_cert.hash(&mut hasher);
        hasher.finish()
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("tls_cert", &format_args!("<{} bytes>", self.tls_cert.len()))
            .field("tls_key", &"<redacted>")
            .field("ca_cert", &format_args!("<{} bytes>", self.ca_cert.len()))
            .finish()
    }
}
