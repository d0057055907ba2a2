use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

/// Pure clap command definitions with zero business logic
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("name")
                .env("DOCKPULSE_NAME")
                .help("Server name, verified against the engine certificate")
                .long("name")
                .long_help(
                    "Logical server name.\n\
                    The engine certificate must carry this name in its SAN, it is\n\
                    also sent as SNI. It is never derived from --address, so the\n\
                    engine can sit behind a load balancer or a floating IP.\n\n\
                    Example: host.internal"
                )
                .short('n')
                .value_name("NAME")
                .required(true),
        )
        .arg(
            Arg::new("address")
                .env("DOCKPULSE_ADDRESS")
                .help("Network address of the Docker engine (IP or hostname)")
                .long("address")
                .short('a')
                .value_name("HOST")
                .required(true),
        )
        .arg(
            Arg::new("tls-cert")
                .env("DOCKPULSE_TLS_CERT")
                .help("Path to client certificate (PEM)")
                .long("tls-cert")
                .value_name("PATH")
                .required(true),
        )
        .arg(
            Arg::new("tls-key")
                .env("DOCKPULSE_TLS_KEY")
                .help("Path to client private key (PEM)")
                .long("tls-key")
                .value_name("PATH")
                .required(true),
        )
        .arg(
            Arg::new("tls-ca")
                .env("DOCKPULSE_TLS_CA")
                .help("Path to CA bundle used to verify the engine (PEM)")
                .long("tls-ca")
                .long_help(
                    "Path to the CA bundle trusted for the engine certificate.\n\
                    Only these certificates are trusted, system roots are never loaded.\n\
                    A bundle without any usable certificate is rejected unless\n\
                    --allow-empty-trust-pool is set."
                )
                .value_name("PATH")
                .required(true),
        )
        .arg(
            Arg::new("docker-port")
                .default_value("2376")
                .env("DOCKPULSE_DOCKER_PORT")
                .help("Docker engine TLS port")
                .long("docker-port")
                .value_parser(clap::value_parser!(u16).range(1..)),
        )
        .arg(
            Arg::new("api-version")
                .default_value("1.34")
                .env("DOCKPULSE_API_VERSION")
                .help("Docker API version used in request paths")
                .long("api-version")
                .value_name("VERSION"),
        )
        .arg(
            Arg::new("dial-timeout")
                .default_value("10")
                .env("DOCKPULSE_DIAL_TIMEOUT")
                .help("TCP connect timeout in seconds")
                .long("dial-timeout")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("handshake-timeout")
                .default_value("10")
                .env("DOCKPULSE_HANDSHAKE_TIMEOUT")
                .help("TLS handshake timeout in seconds")
                .long("handshake-timeout")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("response-header-timeout")
                .default_value("3")
                .env("DOCKPULSE_RESPONSE_HEADER_TIMEOUT")
                .help("Seconds to wait for response headers")
                .long("response-header-timeout")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("request-timeout")
                .default_value("600")
                .env("DOCKPULSE_REQUEST_TIMEOUT")
                .help("Overall request timeout in seconds")
                .long("request-timeout")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("allow-empty-trust-pool")
                .env("DOCKPULSE_ALLOW_EMPTY_TRUST_POOL")
                .help("Accept a CA bundle without usable certificates (every handshake will fail)")
                .long("allow-empty-trust-pool")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("cache-ttl")
                .default_value("3600")
                .env("DOCKPULSE_CACHE_TTL")
                .help("Seconds before a cached engine client is rebuilt")
                .long("cache-ttl")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("interval")
                .default_value("30")
                .env("DOCKPULSE_INTERVAL")
                .help("number of seconds between checks")
                .long("interval")
                .short('i')
                .value_parser(clap::value_parser!(u16).range(1..)),
        )
        .arg(
            Arg::new("listen")
                .env("DOCKPULSE_LISTEN")
                .help("IP address to bind to (default: [::]:port, accepts both IPv6 and IPv4)")
                .long("listen")
                .long_help(
                    "IP address to bind to:\n\
                    Not specified (default) binds to [::]:port which accepts both IPv6 and IPv4 connections.\n\
                    Falls back to 0.0.0.0:port if IPv6 is unavailable.\n\n\
                    Specific IPv4 examples: '0.0.0.0', '127.0.0.1'\n\
                    Specific IPv6: '::', '::1'"
                )
                .short('l')
                .value_name("IP"),
        )
        .arg(
            Arg::new("port")
                .default_value("9300")
                .env("DOCKPULSE_PORT")
                .help("listening port for /metrics")
                .long("port")
                .short('p')
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("verbose")
                .help("Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count),
        )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    const REQUIRED: [&str; 11] = [
        "dockpulse",
        "--name",
        "host.internal",
        "--address",
        "10.0.0.5",
        "--tls-cert",
        "/etc/dockpulse/cert.pem",
        "--tls-key",
        "/etc/dockpulse/key.pem",
        "--tls-ca",
        "/etc/dockpulse/ca.pem",
    ];

    fn args(extra: &[&'static str]) -> Vec<&'static str> {
        let mut args = REQUIRED.to_vec();
        args.extend_from_slice(extra);
        args
    }

    #[test]
    fn test_new() {
        let cmd = new();
        assert_eq!(cmd.get_name(), "dockpulse");
        assert_eq!(
            cmd.get_about().unwrap().to_string(),
            env!("CARGO_PKG_DESCRIPTION")
        );
        assert_eq!(
            cmd.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_new_no_args() {
        let original = std::env::var("DOCKPULSE_NAME").ok();
        // SAFETY: This test runs in isolation and we restore the variable afterward
        unsafe {
            std::env::remove_var("DOCKPULSE_NAME");
        }

        let matches = new().try_get_matches_from(vec!["dockpulse"]);
        assert!(matches.is_err());

        if let Some(name) = original {
            // SAFETY: Restoring the original state
            unsafe {
                std::env::set_var("DOCKPULSE_NAME", name);
            }
        }
    }

    #[test]
    fn test_defaults() {
        let m = new().try_get_matches_from(args(&[])).unwrap();

        assert_eq!(m.get_one::<String>("name").unwrap(), "host.internal");
        assert_eq!(m.get_one::<String>("address").unwrap(), "10.0.0.5");
        assert_eq!(m.get_one::<u16>("docker-port").copied(), Some(2376));
        assert_eq!(m.get_one::<String>("api-version").unwrap(), "1.34");
        assert_eq!(m.get_one::<u64>("dial-timeout").copied(), Some(10));
        assert_eq!(m.get_one::<u64>("handshake-timeout").copied(), Some(10));
        assert_eq!(m.get_one::<u64>("response-header-timeout").copied(), Some(3));
        assert_eq!(m.get_one::<u64>("request-timeout").copied(), Some(600));
        assert_eq!(m.get_one::<u64>("cache-ttl").copied(), Some(3600));
        assert_eq!(m.get_one::<u16>("interval").copied(), Some(30));
        assert_eq!(m.get_one::<u16>("port").copied(), Some(9300));
        assert!(!m.get_flag("allow-empty-trust-pool"));
        assert_eq!(m.get_count("verbose"), 0);
    }

    #[test]
    fn test_overrides() {
        let m = new()
            .try_get_matches_from(args(&[
                "--docker-port",
                "12376",
                "--api-version",
                "1.41",
                "--response-header-timeout",
                "5",
                "--allow-empty-trust-pool",
                "-vv",
            ]))
            .unwrap();

        assert_eq!(m.get_one::<u16>("docker-port").copied(), Some(12376));
        assert_eq!(m.get_one::<String>("api-version").unwrap(), "1.41");
        assert_eq!(m.get_one::<u64>("response-header-timeout").copied(), Some(5));
        assert!(m.get_flag("allow-empty-trust-pool"));
        assert_eq!(m.get_count("verbose"), 2);
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(new().try_get_matches_from(args(&["--docker-port", "0"])).is_err());
        assert!(new().try_get_matches_from(args(&["--interval", "0"])).is_err());
        assert!(
            new()
                .try_get_matches_from(args(&["--dial-timeout", "0"]))
                .is_err()
        );
    }

    #[test]
    fn test_missing_tls_ca() {
        let original = std::env::var("DOCKPULSE_TLS_CA").ok();
        // SAFETY: This test runs in isolation and we restore the variable afterward
        unsafe {
            std::env::remove_var("DOCKPULSE_TLS_CA");
        }

        let matches = new().try_get_matches_from(REQUIRED.get(..9).unwrap().to_vec());
        assert!(matches.is_err());

        if let Some(ca) = original {
            // SAFETY: Restoring the original state
            unsafe {
                std::env::set_var("DOCKPULSE_TLS_CA", ca);
            }
        }
    }
}
