//! Monitor a remote Docker engine over mutual TLS
//!
//! The [`engine`] module turns a [`server::Server`] descriptor into an
//! authenticated client, [`pulse`] drives the periodic health check and
//! [`metrics`] exposes the results to Prometheus.

pub mod cli;
pub mod engine;
pub mod metrics;
pub mod pulse;
pub mod server;
pub mod tls;
