use crate::{
    engine::{
        ClientCache, ClientFactory, ClientOptions, EngineApi, EngineClient, EngineVersion, Error,
        TlsClientFactory,
    },
    metrics::{
        CLIENT_BUILDS_TOTAL, CLIENT_CERT_EXPIRY_DAYS, ENGINE_VERSION_INFO, ERRORS_TOTAL,
        ITERATIONS_TOTAL, LAST_RUNTIME_MS, LAST_SUCCESS, PANICS_RECOVERED, PULSE, RUNTIME,
        TRUST_ANCHORS, encode_metrics,
    },
    server::Server,
};
use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{Duration, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::{net::IpAddr, sync::Arc};
use tokio::{net::TcpListener, task, time};
use tracing::{error, info, warn};

#[derive(Serialize, Deserialize, Debug, Default)]
struct Pulse {
    runtime_ms: i64,
    time: String,
    server: String,
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Start the monitoring service
///
/// # Errors
///
/// Returns an error if the service fails to start or bind to the port
pub async fn start(
    server: Server,
    options: ClientOptions,
    interval: u16,
    listen: Option<IpAddr>,
    port: u16,
    cache_ttl: std::time::Duration,
) -> anyhow::Result<()> {
    let app = Router::new().route("/metrics", get(metrics_handler));

    // Bind to socket with smart fallback
    let (listener, bind_addr) = match listen {
        Some(addr) => {
            let socket_addr = format!("{addr}:{port}");
            let listener = TcpListener::bind(&socket_addr).await?;
            (listener, socket_addr)
        }
        None => {
            // Auto mode: try IPv6 first, fallback to IPv4
            if let Ok(l) = TcpListener::bind(format!("::0:{port}")).await {
                (l, format!("[::]:{port}"))
            } else {
                let socket_addr = format!("0.0.0.0:{port}");
                (TcpListener::bind(&socket_addr).await?, socket_addr)
            }
        }
    };

    info!(
        listen = %bind_addr,
        interval,
        server = %server.name,
        address = %server.address,
        engine_port = options.port,
        api_version = %options.api_version,
        cache_ttl_secs = cache_ttl.as_secs(),
        "dockpulse started"
    );

    let factory = Instrumented(TlsClientFactory::new(options));
    let cache = Arc::new(ClientCache::new(cache_ttl));

    // keep JoinHandle to detect task failures
    let monitor_handle =
        task::spawn(async move { run_loop(factory, cache, server, interval).await });

    let server = axum::serve(listener, app.into_make_service());

    tokio::select! {
        result = server => {
            result?;
        }
        result = monitor_handle => {
            match result {
                Ok(()) => {
                    error!("monitoring loop exited unexpectedly");
                    anyhow::bail!("Monitoring loop stopped");
                }
                Err(e) => {
                    error!(error = %e, "monitoring loop panicked");
                    anyhow::bail!("Monitoring loop panicked: {e}");
                }
            }
        }
    }

    Ok(())
}

async fn metrics_handler() -> impl IntoResponse {
    match encode_metrics() {
        Ok(buffer) => (StatusCode::OK, buffer),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, Vec::new())
        }
    }
}

/// Records every client the wrapped factory builds
struct Instrumented<F>(F);

impl ClientFactory for Instrumented<TlsClientFactory> {
    type Client = EngineClient;

    fn build(&self, server: &Server) -> Result<EngineClient, Error> {
        let client = self.0.build(server)?;

        CLIENT_BUILDS_TOTAL.with_label_values(&[&server.name]).inc();
        TRUST_ANCHORS
            .with_label_values(&[&server.name])
            .set(i64::try_from(client.trust_anchors()).unwrap_or(i64::MAX));
        if let Some(days) = client.client_certificate().and_then(|m| m.expiry_days) {
            CLIENT_CERT_EXPIRY_DAYS
                .with_label_values(&[&server.name])
                .set(days);
        }

        info!(
            server = %server.name,
            endpoint = %client.endpoint(),
            tls_server_name = %client.tls_server_name(),
            "built engine client"
        );

        Ok(client)
    }
}

/// Check one engine: reuse or build its client, then ping and read the version
///
/// A failed handshake drops the cached client so the next check starts from a
/// fresh TLS configuration.
///
/// # Errors
///
/// Returns the construction error, or the first error from `ping`/`version`
pub async fn probe<F: ClientFactory>(
    factory: &F,
    cache: &ClientCache<F::Client>,
    server: &Server,
) -> Result<EngineVersion, Error> {
    let client = cache.get_or_build(factory, server).await?;

    let result = match client.ping().await {
        Ok(()) => client.version().await,
        Err(e) => Err(e),
    };

    if let Err(Error::Handshake(reason)) = &result {
        warn!(server = %server.name, reason = %reason, "evicting engine client after handshake failure");
        cache.evict(&server.name).await;
    }

    result
}

#[inline]
fn update_engine_version_metric(
    server: &str,
    version: &EngineVersion,
    last_version: &mut Option<(String, String)>,
) {
    if let Some((previous_version, previous_api)) = last_version.as_ref()
        && (previous_version != &version.version || previous_api != &version.api_version)
    {
        let _ = ENGINE_VERSION_INFO.remove_label_values(&[
            server,
            previous_version.as_str(),
            previous_api.as_str(),
        ]);
    }

    ENGINE_VERSION_INFO
        .with_label_values(&[server, version.version.as_str(), version.api_version.as_str()])
        .set(1);

    *last_version = Some((version.version.clone(), version.api_version.clone()));
}

#[inline]
fn remaining_sleep_duration(wait_time: Duration, runtime: Duration) -> Option<time::Duration> {
    wait_time
        .checked_sub(&runtime)
        .and_then(|remaining| remaining.to_std().ok())
        .filter(|duration| !duration.is_zero())
}

async fn run_loop<F: ClientFactory>(
    factory: F,
    cache: Arc<ClientCache<F::Client>>,
    server: Server,
    every: u16,
) {
    let mut last_version_label: Option<(String, String)> = None;

    loop {
        // Catch panics in individual iterations to keep loop alive
        let iteration_result = std::panic::AssertUnwindSafe(async {
            let now = Utc::now();
            let wait_time = Duration::seconds(every.into());
            let mut pulse = Pulse {
                time: now.to_rfc3339(),
                server: server.name.clone(),
                ..Default::default()
            };

            let timer = RUNTIME.start_timer();

            match probe(&factory, &cache, &server).await {
                Ok(version) => {
                    PULSE.set(1);
                    ITERATIONS_TOTAL
                        .with_label_values(&[&server.name, "success"])
                        .inc();
                    LAST_SUCCESS
                        .with_label_values(&[&server.name])
                        .set(now.timestamp());
                    update_engine_version_metric(&server.name, &version, &mut last_version_label);

                    pulse.version = version.version;
                    pulse.api_version = Some(version.api_version);
                }
                Err(e) => {
                    PULSE.set(0);
                    error!(server = %server.name, error_type = e.kind(), error = %e, "engine check failed");
                    ITERATIONS_TOTAL
                        .with_label_values(&[&server.name, "error"])
                        .inc();
                    ERRORS_TOTAL
                        .with_label_values(&[&server.name, e.kind()])
                        .inc();

                    pulse.error = Some(e.to_string());
                }
            }

            timer.observe_duration();
            cache.cleanup().await;

            let runtime = Utc::now().signed_duration_since(now);
            pulse.runtime_ms = runtime.num_milliseconds();
            LAST_RUNTIME_MS
                .with_label_values(&[&server.name])
                .set(pulse.runtime_ms);

            if let Ok(serialized) = serde_json::to_string(&pulse) {
                println!("{serialized}");
            }

            // Sleep for remaining interval time to maintain fixed interval
            if let Some(remaining) = remaining_sleep_duration(wait_time, runtime) {
                time::sleep(remaining).await;
            }
        })
        .catch_unwind()
        .await;

        if let Err(panic_info) = iteration_result {
            error!(panic = ?panic_info, "panic in monitoring loop iteration");
            PULSE.set(0);
            PANICS_RECOVERED.inc();
            time::sleep(time::Duration::from_secs(every.into())).await;
        }
    }
}
