//! Redis-backed [`Registry`]: one Set per service name, keyed
//! `servicelib.url.<name>`, containing the URLs of workers currently
//! serving it.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use sysinfo::System;

use crate::errors::RegistryError;
use crate::registry::Registry;

const KEY_PREFIX: &str = "servicelib.url.";

fn redis_key(name: &str) -> String {
    format!("{KEY_PREFIX}{name}")
}

pub struct RedisRegistry {
    manager: ConnectionManager,
    hostname: String,
}

impl RedisRegistry {
    pub async fn connect(url: &str) -> Result<Self, RegistryError> {
        let client = redis::Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self {
            manager,
            hostname: System::host_name().unwrap_or_else(|| "localhost".to_string()),
        })
    }
}

#[async_trait]
impl Registry for RedisRegistry {
    async fn register(&self, services: &[(String, String)]) -> Result<(), RegistryError> {
        let mut conn = self.manager.clone();
        let mut pipe = redis::pipe();
        for (name, url) in services {
            tracing::info!(service = %name, url = %url, "registering service");
            pipe.sadd(redis_key(name), url);
        }
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn unregister(&self, services: &[(String, String)]) -> Result<(), RegistryError> {
        let mut conn = self.manager.clone();
        let mut pipe = redis::pipe();
        for (name, url) in services {
            tracing::info!(service = %name, url = %url, "unregistering service");
            pipe.srem(redis_key(name), url);
        }
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn service_url(&self, name: &str, local_only: bool) -> Result<String, RegistryError> {
        let mut conn = self.manager.clone();
        let key = redis_key(name);

        let found = if local_only {
            let members: HashSet<String> = conn.smembers(&key).await?;
            members.into_iter().find(|u| {
                url::Url::parse(u)
                    .ok()
                    .and_then(|p| p.host_str().map(str::to_string))
                    .map(|host| host == self.hostname)
                    .unwrap_or(false)
            })
        } else {
            conn.srandmember(&key).await?
        };

        found.ok_or_else(|| RegistryError::NoUrl {
            name: name.to_string(),
            local_only,
        })
    }

    async fn services_by_name(&self) -> Result<HashMap<String, HashSet<String>>, RegistryError> {
        let mut conn = self.manager.clone();
        let pattern = format!("{KEY_PREFIX}*");
        let mut names = HashSet::new();
        {
            let mut iter: redis::AsyncIter<String> = conn.scan_match(&pattern).await?;
            while let Some(key) = iter.next().await {
                if let Some(name) = key.strip_prefix(KEY_PREFIX) {
                    names.insert(name.to_string());
                }
            }
        }
        let mut ret = HashMap::new();
        for name in names {
            let urls: HashSet<String> = conn.smembers(redis_key(&name)).await?;
            ret.insert(name, urls);
        }
        Ok(ret)
    }
}
