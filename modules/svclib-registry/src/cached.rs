//! Short-TTL read-through cache around a [`Registry`], so a busy client
//! dispatching many calls per second doesn't hit the backend for every
//! single `service_url` lookup.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::errors::RegistryError;
use crate::registry::Registry;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

pub struct CachedRegistry<R: Registry> {
    inner: R,
    ttl: Duration,
    urls: DashMap<(String, bool), (String, Instant)>,
}

impl<R: Registry> CachedRegistry<R> {
    pub fn new(inner: R, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            urls: DashMap::new(),
        }
    }
}

#[async_trait]
impl<R: Registry> Registry for CachedRegistry<R> {
    async fn register(&self, services: &[(String, String)]) -> Result<(), RegistryError> {
        self.inner.register(services).await
    }

    async fn unregister(&self, services: &[(String, String)]) -> Result<(), RegistryError> {
        self.inner.unregister(services).await
    }

    async fn service_url(&self, name: &str, local_only: bool) -> Result<String, RegistryError> {
        let cache_key = (name.to_string(), local_only);
        if let Some(entry) = self.urls.get(&cache_key) {
            let (url, expires) = entry.value();
            if *expires > Instant::now() {
                return Ok(url.clone());
            }
        }
        let url = self.inner.service_url(name, local_only).await?;
        self.urls
            .insert(cache_key, (url.clone(), Instant::now() + self.ttl));
        Ok(url)
    }

    async fn services_by_name(&self) -> Result<HashMap<String, HashSet<String>>, RegistryError> {
        self.inner.services_by_name().await
    }
}
