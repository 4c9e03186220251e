use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::errors::RegistryError;

/// Maps service names to the worker URLs currently serving them. Workers
/// register themselves on startup and unregister on graceful shutdown;
/// clients resolve a name to one of its registered URLs on every call.
#[async_trait]
pub trait Registry: Send + Sync {
    async fn register(&self, services: &[(String, String)]) -> Result<(), RegistryError>;

    async fn unregister(&self, services: &[(String, String)]) -> Result<(), RegistryError>;

    /// Picks a URL for `name`. When `local_only` is set, only URLs whose
    /// host matches this machine's hostname are eligible.
    async fn service_url(&self, name: &str, local_only: bool) -> Result<String, RegistryError>;

    async fn services_by_name(&self) -> Result<HashMap<String, HashSet<String>>, RegistryError>;
}

/// Groups registered services by the network location (host:port) of
/// their URLs, derived from [`Registry::services_by_name`].
pub async fn services_by_netloc(
    registry: &dyn Registry,
) -> Result<HashMap<String, HashSet<String>>, RegistryError> {
    let mut ret: HashMap<String, HashSet<String>> = HashMap::new();
    for (service, urls) in registry.services_by_name().await? {
        for raw in urls {
            if let Ok(parsed) = url::Url::parse(&raw) {
                let netloc = match parsed.port() {
                    Some(port) => format!("{}:{}", parsed.host_str().unwrap_or(""), port),
                    None => parsed.host_str().unwrap_or("").to_string(),
                };
                ret.entry(netloc).or_default().insert(service.clone());
            }
        }
    }
    Ok(ret)
}
