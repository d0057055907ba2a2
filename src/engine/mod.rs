//! Connection factory for remote Docker engines
//!
//! A [`Server`](crate::server::Server) descriptor goes in, an [`EngineClient`]
//! bound to `https://<address>:2376` with mutual TLS comes out.
//!
//! # Example
//!
//! ```rust,ignore
//! use dockpulse::engine::{ClientFactory, EngineApi, TlsClientFactory};
//!
//! let factory = TlsClientFactory::default();
//! let client = factory.build(&server)?;
//! client.ping().await?;
//! ```

pub mod cache;
pub mod client;
pub mod connector;
pub mod error;
pub mod factory;
pub mod options;

pub use cache::ClientCache;
pub use client::{EngineApi, EngineClient, EngineVersion};
pub use connector::EngineConnector;
pub use error::{Error, Result};
pub use factory::{ClientFactory, TlsClientFactory, endpoint};
pub use options::{ClientOptions, DEFAULT_API_VERSION, DEFAULT_PORT, Timeouts};
