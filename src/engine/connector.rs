use super::Timeouts;
use hyper::{
    Uri,
    rt::{Read, ReadBufCursor, Write},
};
use hyper_util::{
    client::legacy::connect::{Connected, Connection, HttpConnector},
    rt::TokioIo,
};
use rustls::{ClientConfig, pki_types::ServerName};
use std::{
    future::Future,
    io,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};
use thiserror::Error;
use tokio::{
    net::TcpStream,
    time::{Instant, Sleep, sleep},
};
use tokio_rustls::{TlsConnector, client::TlsStream};
use tower_service::Service;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure while opening a connection to the engine
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("tcp connect failed: {0}")]
    Dial(#[source] BoxError),

    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] io::Error),

    #[error("TLS handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),
}

/// No response bytes arrived within the response-header timeout after the
/// request was written
#[derive(Debug, Error)]
#[error("no response headers within {0:?}")]
pub struct ResponseHeaderTimeout(pub Duration);

/// Dials the engine over TCP and runs the TLS handshake against a fixed
/// server name, whatever host the request URI carries.
#[derive(Clone)]
pub struct EngineConnector {
    http: HttpConnector,
    tls: TlsConnector,
    server_name: ServerName<'static>,
    handshake_timeout: Duration,
    response_header_timeout: Duration,
}

impl EngineConnector {
    #[must_use]
    pub fn new(
        config: Arc<ClientConfig>,
        server_name: ServerName<'static>,
        timeouts: &Timeouts,
    ) -> Self {
        let mut http = HttpConnector::new();
        // the scheme is https, TLS is layered on top of the plain TCP stream
        http.enforce_http(false);
        http.set_connect_timeout(Some(timeouts.dial));
        http.set_keepalive(Some(timeouts.keepalive));
        http.set_nodelay(true);

        Self {
            http,
            tls: TlsConnector::from(config),
            server_name,
            handshake_timeout: timeouts.handshake,
            response_header_timeout: timeouts.response_header,
        }
    }

    #[must_use]
    pub const fn server_name(&self) -> &ServerName<'static> {
        &self.server_name
    }
}

impl Service<Uri> for EngineConnector {
    type Response = EngineStream;
    type Error = ConnectError;
    type Future = Pin<Box<dyn Future<Output = Result<EngineStream, ConnectError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.http
            .poll_ready(cx)
            .map_err(|e| ConnectError::Dial(Box::new(e)))
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let dialing = self.http.call(uri);
        let tls = self.tls.clone();
        let server_name = self.server_name.clone();
        let handshake_timeout = self.handshake_timeout;
        let response_header_timeout = self.response_header_timeout;

        Box::pin(async move {
            let tcp = dialing
                .await
                .map_err(|e| ConnectError::Dial(Box::new(e)))?
                .into_inner();

            match tokio::time::timeout(handshake_timeout, tls.connect(server_name, tcp)).await {
                Ok(Ok(stream)) => Ok(EngineStream {
                    io: TokioIo::new(stream),
                    response_header_timeout,
                    deadline: None,
                }),
                Ok(Err(e)) => Err(ConnectError::Handshake(e)),
                Err(_) => Err(ConnectError::HandshakeTimeout(handshake_timeout)),
            }
        })
    }
}

/// TLS stream to the engine as seen by hyper
///
/// Every write (re)arms the response-header deadline, the first read that
/// completes disarms it. Idle pooled connections carry no deadline, so dial and
/// handshake time never count against it.
pub struct EngineStream {
    io: TokioIo<TlsStream<TcpStream>>,
    response_header_timeout: Duration,
    deadline: Option<Pin<Box<Sleep>>>,
}

impl EngineStream {
    fn arm(&mut self) {
        let at = Instant::now() + self.response_header_timeout;
        match self.deadline.as_mut() {
            Some(deadline) => deadline.as_mut().reset(at),
            None => self.deadline = Some(Box::pin(sleep(self.response_header_timeout))),
        }
    }
}

impl Connection for EngineStream {
    fn connected(&self) -> Connected {
        Connected::new()
    }
}

impl Read for EngineStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        match Pin::new(&mut this.io).poll_read(cx, buf) {
            Poll::Pending => {
                if let Some(deadline) = this.deadline.as_mut()
                    && deadline.as_mut().poll(cx).is_ready()
                {
                    this.deadline = None;
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        ResponseHeaderTimeout(this.response_header_timeout),
                    )));
                }
                Poll::Pending
            }
            ready => {
                this.deadline = None;
                ready
            }
        }
    }
}

impl Write for EngineStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let written = Pin::new(&mut this.io).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = &written
            && *n > 0
        {
            this.arm();
        }
        written
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_shutdown(cx)
    }
}
