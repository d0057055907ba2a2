mod run;

use crate::{engine::ClientOptions, server::Server};
use anyhow::{Context, Result};
use std::{net::IpAddr, path::PathBuf, time::Duration};

/// Where the server descriptor comes from on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSource {
    pub name: String,
    pub address: String,
    pub tls_cert: PathBuf,
    pub tls_key: PathBuf,
    pub tls_ca: PathBuf,
}

impl ServerSource {
    /// Read the PEM files into an in-memory [`Server`]
    ///
    /// # Errors
    ///
    /// Returns an error naming the file that could not be read
    pub async fn load(&self) -> Result<Server> {
        let tls_cert = tokio::fs::read(&self.tls_cert)
            .await
            .with_context(|| format!("Failed to read client certificate: {}", self.tls_cert.display()))?;
        let tls_key = tokio::fs::read(&self.tls_key)
            .await
            .with_context(|| format!("Failed to read client key: {}", self.tls_key.display()))?;
        let ca_cert = tokio::fs::read(&self.tls_ca)
            .await
            .with_context(|| format!("Failed to read CA bundle: {}", self.tls_ca.display()))?;

        Ok(Server {
            name: self.name.clone(),
            address: self.address.clone(),
            tls_cert,
            tls_key,
            ca_cert,
        })
    }
}

/// Action enum representing each possible command
#[derive(Debug)]
pub enum Action {
    Monitor {
        server: ServerSource,
        options: ClientOptions,
        interval: u16,
        listen: Option<IpAddr>,
        port: u16,
        cache_ttl: Duration,
    },
}

impl Action {
    /// Execute the action
    ///
    /// # Errors
    ///
    /// Returns an error if the action fails to execute
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
