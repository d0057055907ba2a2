use chrono::{DateTime, Utc};
use x509_parser::prelude::{FromDer, X509Certificate};

/// Certificate details worth reporting, never the key material
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertMetadata {
    /// Certificate subject DN
    pub subject: Option<String>,
    /// Certificate issuer DN
    pub issuer: Option<String>,
    /// Days until certificate expiration (negative if expired)
    pub expiry_days: Option<i64>,
}

impl CertMetadata {
    /// Extract metadata from a DER-encoded certificate
    ///
    /// Returns `None` if the certificate cannot be parsed.
    #[must_use]
    pub fn from_der(cert_der: &[u8]) -> Option<Self> {
        Self::from_der_at(cert_der, Utc::now())
    }

    fn from_der_at(cert_der: &[u8], now: DateTime<Utc>) -> Option<Self> {
        let (_, cert) = X509Certificate::from_der(cert_der).ok()?;

        let raw = cert.validity().not_after.to_datetime();
        let expiry_days = DateTime::<Utc>::from_timestamp(raw.unix_timestamp(), raw.nanosecond())
            .map(|not_after| (not_after - now).num_days());

        Some(Self {
            subject: Some(cert.subject().to_string()),
            issuer: Some(cert.issuer().to_string()),
            expiry_days,
        })
    }
}
