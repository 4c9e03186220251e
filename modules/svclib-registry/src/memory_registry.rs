//! In-process [`Registry`] with no external dependency, used by local
//! demos and tests that don't need a real Redis instance.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use dashmap::DashMap;
use rand::seq::IteratorRandom;

use crate::errors::RegistryError;
use crate::registry::Registry;

#[derive(Default)]
pub struct MemoryRegistry {
    services: DashMap<String, HashSet<String>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn register(&self, services: &[(String, String)]) -> Result<(), RegistryError> {
        for (name, url) in services {
            self.services.entry(name.clone()).or_default().insert(url.clone());
        }
        Ok(())
    }

    async fn unregister(&self, services: &[(String, String)]) -> Result<(), RegistryError> {
        for (name, url) in services {
            if let Some(mut urls) = self.services.get_mut(name) {
                urls.remove(url);
            }
        }
        Ok(())
    }

    async fn service_url(&self, name: &str, local_only: bool) -> Result<String, RegistryError> {
        let _ = local_only; // every registration is "local" in the in-process registry
        self.services
            .get(name)
            .and_then(|urls| urls.iter().choose(&mut rand::thread_rng()).cloned())
            .ok_or_else(|| RegistryError::NoUrl {
                name: name.to_string(),
                local_only,
            })
    }

    async fn services_by_name(&self) -> Result<HashMap<String, HashSet<String>>, RegistryError> {
        Ok(self
            .services
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_resolve() {
        let reg = MemoryRegistry::new();
        reg.register(&[("hello".into(), "http://localhost:1/".into())])
            .await
            .unwrap();
        let url = reg.service_url("hello", false).await.unwrap();
        assert_eq!(url, "http://localhost:1/");
    }

    #[tokio::test]
    async fn unregister_removes_url() {
        let reg = MemoryRegistry::new();
        reg.register(&[("hello".into(), "http://localhost:1/".into())])
            .await
            .unwrap();
        reg.unregister(&[("hello".into(), "http://localhost:1/".into())])
            .await
            .unwrap();
        assert!(reg.service_url("hello", false).await.is_err());
    }
}
