use super::{ClientFactory, Result};
use crate::server::Server;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

struct Entry<C> {
    client: Arc<C>,
    fingerprint: u64,
    created: Instant,
}

/// Engine clients cached per server name, with TTL
///
/// A cached client is handed out only while the descriptor it was built from
/// is unchanged, so rotated credentials or a moved address produce a new one.
pub struct ClientCache<C> {
    data: Arc<RwLock<HashMap<String, Entry<C>>>>,
    ttl: Duration,
}

impl<C> ClientCache<C> {
    /// Create a new client cache with the given TTL
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Get the cached client for `server` if still valid
    pub async fn get(&self, server: &Server) -> Option<Arc<C>> {
        let cache = self.data.read().await;
        if let Some(entry) = cache.get(&server.name)
            && entry.fingerprint == server.fingerprint()
            && entry.created.elapsed() < self.ttl
        {
            return Some(Arc::clone(&entry.client));
        }
        drop(cache);
        None
    }

    /// Store a client for `server`, replacing any previous one
    pub async fn set(&self, server: &Server, client: Arc<C>) {
        let mut cache = self.data.write().await;
        cache.insert(
            server.name.clone(),
            Entry {
                client,
                fingerprint: server.fingerprint(),
                created: Instant::now(),
            },
        );
    }

    /// Return the cached client or build and cache a new one
    ///
    /// # Errors
    ///
    /// Returns the factory error if a new client is needed and cannot be built;
    /// nothing is cached in that case.
    pub async fn get_or_build<F>(&self, factory: &F, server: &Server) -> Result<Arc<C>>
    where
        F: ClientFactory<Client = C>,
    {
        if let Some(client) = self.get(server).await {
            return Ok(client);
        }

        let client = Arc::new(factory.build(server)?);
        self.set(server, Arc::clone(&client)).await;
        Ok(client)
    }

    /// Drop the client cached for `name`, returns whether one was present
    pub async fn evict(&self, name: &str) -> bool {
        let mut cache = self.data.write().await;
        cache.remove(name).is_some()
    }

    /// Clear expired entries from cache
    pub async fn cleanup(&self) {
        let mut cache = self.data.write().await;
        cache.retain(|_, entry| entry.created.elapsed() < self.ttl);
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}
