use crate::engine::{Error, Result};
use rustls::{
    InconsistentKeys,
    crypto::CryptoProvider,
    pki_types::{CertificateDer, PrivateKeyDer},
    sign::CertifiedKey,
};
use rustls_pemfile::{certs, private_key};

/// Client certificate chain and the matching private key
pub struct ClientIdentity {
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

impl ClientIdentity {
    /// Leaf certificate presented to the engine
    #[must_use]
    pub fn leaf(&self) -> Option<&CertificateDer<'static>> {
        self.chain.first()
    }

    #[must_use]
    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }

    pub(crate) fn into_parts(self) -> (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>) {
        (self.chain, self.key)
    }
}

/// Parse a PEM certificate chain and private key into a client identity
///
/// # Errors
///
/// Returns [`Error::Credential`] if either PEM is malformed or empty, the key
/// type is not supported by `provider`, or the key does not belong to the
/// leaf certificate.
pub fn parse_identity(
    cert_pem: &[u8],
    key_pem: &[u8],
    provider: &CryptoProvider,
) -> Result<ClientIdentity> {
    let chain = load_cert_chain(cert_pem)?;
    let key = load_private_key(key_pem)?;

    let signing_key = provider
        .key_provider
        .load_private_key(key.clone_key())
        .map_err(|e| Error::Credential(format!("unsupported private key: {e}")))?;

    match CertifiedKey::new(chain.clone(), signing_key).keys_match() {
        // the key cannot expose its public half, leave the check to rustls
        Ok(()) | Err(rustls::Error::InconsistentKeys(InconsistentKeys::Unknown)) => {}
        Err(e) => {
            return Err(Error::Credential(format!(
                "private key does not match certificate: {e}"
            )));
        }
    }

    Ok(ClientIdentity { chain, key })
}

fn load_cert_chain(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = pem;
    let parsed = certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Credential(format!("invalid certificate PEM: {e}")))?;

    if parsed.is_empty() {
        return Err(Error::Credential(
            "no certificates found in client certificate".to_string(),
        ));
    }

    Ok(parsed)
}

fn load_private_key(pem: &[u8]) -> Result<PrivateKeyDer<'static>> {
    let mut reader = pem;
    private_key(&mut reader)
        .map_err(|e| Error::Credential(format!("invalid private key PEM: {e}")))?
        .ok_or_else(|| Error::Credential("no private key found in client key".to_string()))
}
