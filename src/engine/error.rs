use std::time::Duration;
use thiserror::Error;

/// Errors produced while building or using an engine client
#[derive(Debug, Error)]
pub enum Error {
    /// Client certificate or key could not be parsed, or they do not match
    #[error("invalid client credentials: {0}")]
    Credential(String),

    /// The CA bundle yields no trust anchors
    #[error("invalid trust configuration: {0}")]
    TrustConfiguration(String),

    /// The logical name cannot be used as a TLS server name
    #[error("invalid server name {name:?}: {reason}")]
    ServerName { name: String, reason: String },

    /// Address and port do not form a valid endpoint
    #[error("invalid endpoint {0}")]
    Endpoint(String),

    /// TLS negotiation with the engine failed
    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// TCP connection could not be established
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP transport error: {0}")]
    Http(String),

    /// The engine answered with a non-success status
    #[error("engine returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode engine response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    /// Short label used for metrics and logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Credential(_) => "credential",
            Self::TrustConfiguration(_) => "trust",
            Self::ServerName { .. } | Self::Endpoint(_) => "configuration",
            Self::Handshake(_) => "handshake",
            Self::Timeout { .. } => "timeout",
            Self::Connect(_) => "connection",
            Self::Http(_) => "http",
            Self::Api { .. } => "api",
            Self::Decode(_) => "decode",
        }
    }

    /// Errors raised while assembling a client, before any network I/O
    #[must_use]
    pub const fn is_construction(&self) -> bool {
        matches!(
            self,
            Self::Credential(_)
                | Self::TrustConfiguration(_)
                | Self::ServerName { .. }
                | Self::Endpoint(_)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
