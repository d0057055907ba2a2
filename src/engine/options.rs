use std::time::Duration;

/// Docker engine TLS port
pub const DEFAULT_PORT: u16 = 2376;

/// Engine API version every request is pinned to
pub const DEFAULT_API_VERSION: &str = "1.34";

/// TCP connect timeout
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// TCP keep-alive probe interval on engine connections
pub const TCP_KEEPALIVE: Duration = Duration::from_secs(10);

/// TLS handshake timeout, counted from an established TCP connection
pub const TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Time allowed between writing a request and the first response bytes
pub const RESPONSE_HEADER_TIMEOUT: Duration = Duration::from_secs(3);

/// Recorded for parity with engine clients that send `Expect: 100-continue`.
/// This client never sends that header, so no request waits on this value and
/// overriding it has no effect.
pub const EXPECT_CONTINUE_TIMEOUT: Duration = Duration::from_secs(4);

/// Upper bound for a whole request, guards against hung engines
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Transport timeouts applied to every engine client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// TCP connect
    pub dial: Duration,
    /// TCP keep-alive probe interval
    pub keepalive: Duration,
    /// TLS handshake, after the TCP connection is up
    pub handshake: Duration,
    /// From request written until response headers arrive, dial and
    /// handshake excluded
    pub response_header: Duration,
    /// Not applied, see [`EXPECT_CONTINUE_TIMEOUT`]
    pub expect_continue: Duration,
    /// End-to-end, including reading the body
    pub request: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            dial: DIAL_TIMEOUT,
            keepalive: TCP_KEEPALIVE,
            handshake: TLS_HANDSHAKE_TIMEOUT,
            response_header: RESPONSE_HEADER_TIMEOUT,
            expect_continue: EXPECT_CONTINUE_TIMEOUT,
            request: REQUEST_TIMEOUT,
        }
    }
}

/// Settings shared by every client a factory builds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub port: u16,
    pub api_version: String,
    pub timeouts: Timeouts,
    /// Build clients even when the CA bundle yields no anchors. Such clients
    /// reject every engine certificate.
    pub allow_empty_trust_pool: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            api_version: DEFAULT_API_VERSION.to_string(),
            timeouts: Timeouts::default(),
            allow_empty_trust_pool: false,
        }
    }
}
