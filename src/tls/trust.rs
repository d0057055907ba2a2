use rustls::RootCertStore;
use rustls_pemfile::certs;

/// Private set of CA certificates used to validate engine certificates
///
/// Built from a PEM bundle the way a permissive PEM appender would: blocks that
/// fail to decode or parse are skipped. An empty pool is representable, it
/// rejects every server certificate.
#[derive(Debug, Clone)]
pub struct TrustPool {
    roots: RootCertStore,
    ignored: usize,
}

impl TrustPool {
    /// Append every certificate found in `bundle` to an empty pool
    #[must_use]
    pub fn from_pem(bundle: &[u8]) -> Self {
        let mut reader = bundle;
        let mut ders = Vec::new();
        let mut ignored = 0;

        for item in certs(&mut reader) {
            match item {
                Ok(der) => ders.push(der),
                Err(_) => ignored += 1,
            }
        }

        let mut roots = RootCertStore::empty();
        let (_, unparsable) = roots.add_parsable_certificates(ders);

        Self {
            roots,
            ignored: ignored + unparsable,
        }
    }

    /// Number of trust anchors in the pool
    #[must_use]
    pub fn anchors(&self) -> usize {
        self.roots.len()
    }

    /// Certificates found in the bundle that could not be used as anchors
    #[must_use]
    pub const fn ignored(&self) -> usize {
        self.ignored
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    #[must_use]
    pub fn into_root_store(self) -> RootCertStore {
        self.roots
    }
}
