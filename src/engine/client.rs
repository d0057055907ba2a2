use super::{
    EngineConnector, Error, Result, Timeouts,
    connector::{ConnectError, ResponseHeaderTimeout},
};
use crate::tls::CertMetadata;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, Request, StatusCode, header};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{error::Error as StdError, io};

/// Read-only subset of the engine API used by callers of the factory
#[async_trait]
pub trait EngineApi: Send + Sync {
    /// `GET /_ping`, succeeds when the engine answers `OK`
    async fn ping(&self) -> Result<()>;

    /// `GET /version`
    async fn version(&self) -> Result<EngineVersion>;
}

/// Response of `GET /version`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EngineVersion {
    pub version: String,
    pub api_version: String,
    #[serde(rename = "MinAPIVersion")]
    pub min_api_version: String,
    pub git_commit: String,
    pub go_version: String,
    pub os: String,
    pub arch: String,
    pub kernel_version: String,
}

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

/// Authenticated client bound to one engine
///
/// Cloning is cheap and clones share the connection pool.
#[derive(Clone)]
pub struct EngineClient {
    http: Client<EngineConnector, Full<Bytes>>,
    endpoint: String,
    server_name: String,
    api_version: String,
    timeouts: Timeouts,
    trust_anchors: usize,
    client_certificate: Option<CertMetadata>,
}

impl std::fmt::Debug for EngineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineClient")
            .field("endpoint", &self.endpoint)
            .field("server_name", &self.server_name)
            .field("api_version", &self.api_version)
            .field("timeouts", &self.timeouts)
            .field("trust_anchors", &self.trust_anchors)
            .finish_non_exhaustive()
    }
}

impl EngineClient {
    pub(crate) fn new(
        http: Client<EngineConnector, Full<Bytes>>,
        endpoint: String,
        server_name: String,
        api_version: String,
        timeouts: Timeouts,
        trust_anchors: usize,
        client_certificate: Option<CertMetadata>,
    ) -> Self {
        Self {
            http,
            endpoint,
            server_name,
            api_version,
            timeouts,
            trust_anchors,
            client_certificate,
        }
    }

    /// Base URL, `https://<address>:<port>`
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Name the engine certificate is verified against
    #[must_use]
    pub fn tls_server_name(&self) -> &str {
        &self.server_name
    }

    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    #[must_use]
    pub const fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Number of CA certificates trusted by this client
    #[must_use]
    pub const fn trust_anchors(&self) -> usize {
        self.trust_anchors
    }

    /// Metadata of the leaf certificate presented to the engine
    #[must_use]
    pub const fn client_certificate(&self) -> Option<&CertMetadata> {
        self.client_certificate.as_ref()
    }

    /// Versioned URL for an API path
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/v{}/{}",
            self.endpoint,
            self.api_version,
            path.trim_start_matches('/')
        )
    }

    /// Issue a request and return the status and the full body
    ///
    /// Dial and handshake run under their own timeouts inside the connector,
    /// the response-header timeout starts once the request is written on the
    /// connection and the whole exchange must finish within the request
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, handshake or request fails, or a
    /// timeout elapses.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Bytes>,
    ) -> Result<(StatusCode, Bytes)> {
        let url = self.url(path);
        let mut builder = Request::builder().method(method).uri(url.as_str());
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        let request = builder
            .body(Full::new(body.unwrap_or_default()))
            .map_err(|e| Error::Endpoint(format!("{url}: {e}")))?;

        tracing::trace!(url = %url, "engine request");

        let exchange = async {
            let response = self
                .http
                .request(request)
                .await
                .map_err(|e| classify(&e, &self.timeouts))?;

            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| Error::Http(error_chain(&e)))?
                .to_bytes();

            Ok::<_, Error>((status, body))
        };

        tokio::time::timeout(self.timeouts.request, exchange)
            .await
            .map_err(|_| Error::Timeout {
                operation: "request",
                after: self.timeouts.request,
            })?
    }

    /// `GET` a path and decode the JSON body
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] for non-success statuses and [`Error::Decode`]
    /// for bodies that are not the expected JSON.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let (status, body) = self.request(Method::GET, path, None).await?;
        check_status(status, &body)?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl EngineApi for EngineClient {
    async fn ping(&self) -> Result<()> {
        let (status, body) = self.request(Method::GET, "/_ping", None).await?;
        check_status(status, &body)?;

        if body.as_ref() == b"OK" {
            Ok(())
        } else {
            Err(Error::Api {
                status: status.as_u16(),
                message: format!(
                    "unexpected ping response: {}",
                    String::from_utf8_lossy(&body)
                ),
            })
        }
    }

    async fn version(&self) -> Result<EngineVersion> {
        self.get_json("/version").await
    }
}

fn check_status(status: StatusCode, body: &[u8]) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }

    let message = serde_json::from_slice::<ApiMessage>(body).map_or_else(
        |_| String::from_utf8_lossy(body).trim().to_string(),
        |m| m.message,
    );

    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

/// Map a transport error to the first meaningful cause in its chain
fn classify(err: &hyper_util::client::legacy::Error, timeouts: &Timeouts) -> Error {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);

    while let Some(current) = source {
        if let Some(connect) = current.downcast_ref::<ConnectError>() {
            return match connect {
                ConnectError::Handshake(e) => Error::Handshake(e.to_string()),
                ConnectError::HandshakeTimeout(after) => Error::Timeout {
                    operation: "TLS handshake",
                    after: *after,
                },
                ConnectError::Dial(e) if is_timed_out(&**e) => Error::Timeout {
                    operation: "dial",
                    after: timeouts.dial,
                },
                ConnectError::Dial(_) => Error::Connect(error_chain(connect)),
            };
        }

        if let Some(io_err) = current.downcast_ref::<io::Error>()
            && let Some(inner) = io_err.get_ref()
        {
            if let Some(ResponseHeaderTimeout(after)) = inner.downcast_ref::<ResponseHeaderTimeout>()
            {
                return Error::Timeout {
                    operation: "response headers",
                    after: *after,
                };
            }

            // alerts sent after the handshake, e.g. a rejected client certificate
            if inner.downcast_ref::<rustls::Error>().is_some() {
                return Error::Handshake(inner.to_string());
            }
        }

        source = current.source();
    }

    Error::Http(error_chain(err))
}

fn is_timed_out(err: &(dyn StdError + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(current) = source {
        if current
            .downcast_ref::<io::Error>()
            .is_some_and(|e| e.kind() == io::ErrorKind::TimedOut)
        {
            return true;
        }
        source = current.source();
    }
    false
}

fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(current) = source {
        let next = current.to_string();
        if !message.contains(&next) {
            message.push_str(": ");
            message.push_str(&next);
        }
        source = current.source();
    }
    message
}
