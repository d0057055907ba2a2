#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use dockpulse::server::Server;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyPair, KeyUsagePurpose,
};
use rustls::{
    RootCertStore, ServerConfig,
    crypto::ring::default_provider,
    pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer},
    server::WebPkiClientVerifier,
};
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
};
use tokio_rustls::TlsAcceptor;

pub const ENGINE_NAME: &str = "host.internal";

pub const VERSION_JSON: &str = r#"{"Version":"24.0.7","ApiVersion":"1.43","MinAPIVersion":"1.12","GitCommit":"311b9ff","GoVersion":"go1.20.10","Os":"linux","Arch":"amd64","KernelVersion":"6.5.0"}"#;

/// A throwaway certificate authority
pub struct Authority {
    pub cert: Certificate,
    pub key: KeyPair,
}

impl Authority {
    pub fn new(common_name: &str) -> Self {
        let key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params
            .distinguished_name
            .push(DnType::CommonName, common_name);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let cert = params.self_signed(&key).unwrap();
        Self { cert, key }
    }

    pub fn pem(&self) -> String {
        self.cert.pem()
    }

    fn issue(&self, names: &[&str], purpose: ExtendedKeyUsagePurpose) -> Leaf {
        let key = KeyPair::generate().unwrap();
        let sans = names.iter().map(ToString::to_string).collect::<Vec<_>>();
        let mut params = CertificateParams::new(sans).unwrap();
        if let Some(first) = names.first() {
            params.distinguished_name.push(DnType::CommonName, *first);
        }
        params.extended_key_usages = vec![purpose];
        let cert = params.signed_by(&key, &self.cert, &self.key).unwrap();
        Leaf { cert, key }
    }

    /// Engine certificate valid for `names`
    pub fn server_leaf(&self, names: &[&str]) -> Leaf {
        self.issue(names, ExtendedKeyUsagePurpose::ServerAuth)
    }

    /// Client certificate for mutual TLS
    pub fn client_leaf(&self, common_name: &str) -> Leaf {
        self.issue(&[common_name], ExtendedKeyUsagePurpose::ClientAuth)
    }
}

pub struct Leaf {
    pub cert: Certificate,
    pub key: KeyPair,
}

impl Leaf {
    pub fn cert_pem(&self) -> String {
        self.cert.pem()
    }

    pub fn key_pem(&self) -> String {
        self.key.serialize_pem()
    }
}

/// Everything needed for one engine and one client
pub struct Pki {
    pub ca: Authority,
    pub engine: Leaf,
    pub client: Leaf,
}

impl Pki {
    pub fn new() -> Self {
        let ca = Authority::new("dockpulse test CA");
        let engine = ca.server_leaf(&[ENGINE_NAME]);
        let client = ca.client_leaf("dockpulse");
        Self { ca, engine, client }
    }

    /// Descriptor for an engine named `name` reachable at `address`
    pub fn server(&self, name: &str, address: &str) -> Server {
        Server {
            name: name.to_string(),
            address: address.to_string(),
            tls_cert: self.client.cert_pem().into_bytes(),
            tls_key: self.client.key_pem().into_bytes(),
            ca_cert: self.ca.pem().into_bytes(),
        }
    }
}

/// How the stub engine answers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behavior {
    /// `/_ping` and `/version` like a healthy engine
    Healthy,
    /// read the request and never answer
    Stall,
    /// hold the TCP connection this long before starting the TLS handshake,
    /// then answer like `Healthy`
    SlowHandshake(Duration),
}

/// Local TLS server standing in for a Docker engine
pub struct EngineStub {
    pub addr: SocketAddr,
    sni: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl EngineStub {
    /// Serve `leaf` on 127.0.0.1, requiring client certificates issued by `ca`
    pub async fn spawn(ca: &Authority, leaf: &Leaf, behavior: Behavior) -> Self {
        let provider = Arc::new(default_provider());

        let mut roots = RootCertStore::empty();
        roots.add(ca.cert.der().clone()).unwrap();
        let verifier =
            WebPkiClientVerifier::builder_with_provider(Arc::new(roots), Arc::clone(&provider))
                .build()
                .unwrap();

        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(leaf.key.serialize_der()));
        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_client_cert_verifier(verifier)
            .with_single_cert(vec![leaf.cert.der().clone()], key)
            .unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let sni = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&sni);

        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                let seen = Arc::clone(&seen);
                tokio::spawn(async move {
                    if let Behavior::SlowHandshake(delay) = behavior {
                        tokio::time::sleep(delay).await;
                    }
                    let Ok(mut tls) = acceptor.accept(stream).await else {
                        return;
                    };
                    if let Some(name) = tls.get_ref().1.server_name() {
                        seen.lock().unwrap().push(name.to_string());
                    }

                    let Some(path) = read_request_path(&mut tls).await else {
                        return;
                    };

                    if behavior == Behavior::Stall {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        return;
                    }

                    let (status, content_type, body) = respond(&path);
                    let response = format!(
                        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = tls.write_all(response.as_bytes()).await;
                    let _ = tls.shutdown().await;
                });
            }
        });

        Self { addr, sni, handle }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// SNI values presented by clients so far
    pub fn server_names(&self) -> Vec<String> {
        self.sni.lock().unwrap().clone()
    }
}

impl Drop for EngineStub {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn read_request_path<S>(stream: &mut S) -> Option<String>
where
    S: AsyncReadExt + Unpin,
{
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];
    while !buffer.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buffer.extend_from_slice(chunk.get(..n)?);
    }

    let head = String::from_utf8_lossy(&buffer);
    head.lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .map(ToString::to_string)
}

fn respond(path: &str) -> (&'static str, &'static str, &'static str) {
    if path.ends_with("/_ping") {
        ("200 OK", "text/plain", "OK")
    } else if path.ends_with("/version") {
        ("200 OK", "application/json", VERSION_JSON)
    } else {
        (
            "404 Not Found",
            "application/json",
            r#"{"message":"page not found"}"#,
        )
    }
}
