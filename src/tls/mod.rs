//! TLS material assembly for engine connections
//!
//! Turns the in-memory PEM credentials of a [`Server`](crate::server::Server)
//! into a rustls client configuration with mutual authentication and a private
//! trust root. Nothing here touches the filesystem or the network.
//!
//! # Module Organization
//!
//! - `credentials` - Client certificate and key parsing, key/cert match check
//! - `trust` - Private CA pool built from a PEM bundle
//! - `config` - rustls `ClientConfig` and server name handling
//! - `metadata` - Certificate metadata for reporting

pub mod config;
pub mod credentials;
pub mod metadata;
pub mod trust;

// Re-export commonly used types
pub use config::{build_client_config, server_name};
pub use credentials::{ClientIdentity, parse_identity};
pub use metadata::CertMetadata;
pub use trust::TrustPool;
