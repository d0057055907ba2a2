use crate::{
    cli::actions::{Action, ServerSource},
    engine::{ClientOptions, Timeouts},
};
use anyhow::{Context, Result};
use clap::ArgMatches;
use std::{net::IpAddr, path::PathBuf, time::Duration};

fn required<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a String> {
    matches
        .get_one::<String>(id)
        .with_context(|| format!("--{id} is required"))
}

fn seconds(matches: &ArgMatches, id: &str, default: Duration) -> Duration {
    matches
        .get_one::<u64>(id)
        .copied()
        .map_or(default, Duration::from_secs)
}

/// Build client options from flags, unset values keep the engine defaults
fn client_options(matches: &ArgMatches) -> ClientOptions {
    let defaults = ClientOptions::default();

    let timeouts = Timeouts {
        dial: seconds(matches, "dial-timeout", defaults.timeouts.dial),
        handshake: seconds(matches, "handshake-timeout", defaults.timeouts.handshake),
        response_header: seconds(
            matches,
            "response-header-timeout",
            defaults.timeouts.response_header,
        ),
        request: seconds(matches, "request-timeout", defaults.timeouts.request),
        ..defaults.timeouts
    };

    ClientOptions {
        port: matches
            .get_one::<u16>("docker-port")
            .copied()
            .unwrap_or(defaults.port),
        api_version: matches
            .get_one::<String>("api-version")
            .cloned()
            .unwrap_or(defaults.api_version),
        timeouts,
        allow_empty_trust_pool: matches.get_flag("allow-empty-trust-pool"),
    }
}

/// Convert `ArgMatches` into typed Action enum with validation
///
/// # Errors
///
/// Returns an error if required parameters are missing or the listen address
/// is invalid
pub fn dispatch(matches: &ArgMatches) -> Result<Action> {
    let server = ServerSource {
        name: required(matches, "name")?.clone(),
        address: required(matches, "address")?.clone(),
        tls_cert: PathBuf::from(required(matches, "tls-cert")?),
        tls_key: PathBuf::from(required(matches, "tls-key")?),
        tls_ca: PathBuf::from(required(matches, "tls-ca")?),
    };

    // Extract interval with default
    let interval = matches.get_one::<u16>("interval").copied().unwrap_or(30);

    // Extract and validate listen address
    let listen = matches
        .get_one::<String>("listen")
        .map(|addr| {
            addr.parse::<IpAddr>()
                .with_context(|| format!("Invalid IP address: {addr}"))
        })
        .transpose()?;

    // Extract port with default
    let port = matches.get_one::<u16>("port").copied().unwrap_or(9300);

    let cache_ttl = seconds(matches, "cache-ttl", Duration::from_secs(3600));

    Ok(Action::Monitor {
        server,
        options: client_options(matches),
        interval,
        listen,
        port,
        cache_ttl,
    })
}
