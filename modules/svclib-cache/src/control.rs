//! Coalescing decorator around a [`Cache`]: caches a call's JSON result,
//! and makes concurrent callers computing the same cache key wait on the
//! first one instead of all recomputing it.

use std::future::Future;
use std::time::Duration;

use serde_json::{Map, Value};
use svclib_core::errors::ServiceError;
use svclib_core::metadata::Metadata;

use crate::backend::{get_response, Cache, IN_FLIGHT};
use crate::errors::CacheError;

pub const DEFAULT_CHECK_FREQUENCY: Duration = Duration::from_millis(100);
pub const DEFAULT_INFLIGHT_TTL: Duration = Duration::from_secs(60);

pub struct CacheControl {
    cache: std::sync::Arc<dyn Cache>,
    ttl: Duration,
    result_is_url: bool,
    check_frequency: Duration,
    inflight_ttl: Duration,
    http: reqwest::Client,
}

impl CacheControl {
    pub fn new(cache: std::sync::Arc<dyn Cache>, ttl: Duration) -> Self {
        Self {
            cache,
            ttl,
            result_is_url: false,
            check_frequency: DEFAULT_CHECK_FREQUENCY,
            inflight_ttl: DEFAULT_INFLIGHT_TTL,
            http: reqwest::Client::new(),
        }
    }

    pub fn result_is_url(mut self, value: bool) -> Self {
        self.result_is_url = value;
        self
    }

    /// Runs `compute` under cache control keyed by `cache_key`, unless
    /// `cache_enabled` is false (in which case `compute` always runs and
    /// nothing is touched in the cache).
    pub async fn call<F, Fut>(
        &self,
        metadata: &Metadata,
        cache_enabled: bool,
        cache_key: &str,
        compute: F,
    ) -> Result<Value, ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, ServiceError>>,
    {
        if !cache_enabled {
            metadata.annotate("cache", Value::String("off".into()));
            return compute().await;
        }

        let _timer = metadata.timer("cache");
        let result = self.run_state_machine(metadata, cache_key, compute).await;
        match &result {
            Ok((status, _)) => {
                metadata.annotate("cache", Value::String(status.to_string()));
                metadata.annotate("cache_key", Value::String(cache_key.to_string()));
                metadata.annotate("cache_ttl", Value::from(self.ttl.as_secs()));
            }
            Err(_) => {
                let _ = self.cache.delete(cache_key).await;
            }
        }
        result.map(|(_, value)| value)
    }

    async fn run_state_machine<F, Fut>(
        &self,
        metadata: &Metadata,
        cache_key: &str,
        compute: F,
    ) -> Result<(&'static str, Value), ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, ServiceError>>,
    {
        // Resolves an initial hit, an in-flight wait settling into a hit,
        // or a genuine miss (None) in one pass.
        match self.fetch_initial(cache_key).await? {
            Some(value) if self.is_valid(&value).await => Ok(("hit", value)),
            _ => self.miss(metadata, cache_key, compute).await,
        }
    }

    async fn fetch_initial(&self, cache_key: &str) -> Result<Option<Value>, ServiceError> {
        let raw = self.cache.get(cache_key).await.map_err(cache_err)?;
        match raw.as_deref() {
            None => Ok(None),
            Some(IN_FLIGHT) => self.poll_until_resolved(cache_key).await,
            Some(_) => Ok(get_response(self.cache.as_ref(), cache_key)
                .await
                .map_err(cache_err)?
                .and_then(|v| v.get("result").cloned())),
        }
    }

    async fn poll_until_resolved(&self, cache_key: &str) -> Result<Option<Value>, ServiceError> {
        loop {
            tokio::time::sleep(self.check_frequency).await;
            let raw = self.cache.get(cache_key).await.map_err(cache_err)?;
            match raw.as_deref() {
                Some(IN_FLIGHT) => continue,
                None => return Ok(None),
                Some(_) => {
                    return Ok(get_response(self.cache.as_ref(), cache_key)
                        .await
                        .map_err(cache_err)?
                        .and_then(|v| v.get("result").cloned()))
                }
            }
        }
    }

    async fn miss<F, Fut>(
        &self,
        metadata: &Metadata,
        cache_key: &str,
        compute: F,
    ) -> Result<(&'static str, Value), ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, ServiceError>>,
    {
        self.cache
            .set(cache_key, IN_FLIGHT, self.inflight_ttl)
            .await
            .map_err(cache_err)?;

        // Exclude the wrapped call's own runtime from the "cache" timer;
        // it should measure cache-control overhead, not the work itself.
        metadata.pause_timer("cache");
        let result = compute().await;
        metadata.resume_timer("cache");
        let result = result?;

        let mut envelope = Map::new();
        envelope.insert("result".into(), result.clone());
        envelope.insert("created".into(), Value::from(now_unix()));
        envelope.insert("max_age".into(), Value::from(self.ttl.as_secs()));
        self.cache
            .set(cache_key, &Value::Object(envelope).to_string(), self.ttl)
            .await
            .map_err(cache_err)?;

        Ok(("miss", result))
    }

    /// Walks a result value looking for `{"location": <url>}` objects and
    /// validates each one is still reachable (and, if a `contentLength`
    /// was recorded, that it still matches). A result with no URLs at all
    /// is trivially valid.
    async fn is_valid(&self, data: &Value) -> bool {
        if !self.result_is_url {
            return true;
        }
        self.check_urls(data).await
    }

    fn check_urls<'a>(&'a self, data: &'a Value) -> std::pin::Pin<Box<dyn Future<Output = bool> + 'a>> {
        Box::pin(async move {
            match data {
                Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => true,
                Value::Array(items) => {
                    for item in items {
                        if !self.check_urls(item).await {
                            return false;
                        }
                    }
                    true
                }
                Value::Object(map) => {
                    let Some(location) = map.get("location").and_then(Value::as_str) else {
                        for v in map.values() {
                            if !self.check_urls(v).await {
                                return false;
                            }
                        }
                        return true;
                    };
                    match self.http.head(location).send().await {
                        Ok(resp) if resp.status().is_success() => {
                            if let Some(cached_len) = map.get("contentLength").and_then(Value::as_u64) {
                                let remote_len = resp
                                    .headers()
                                    .get(reqwest::header::CONTENT_LENGTH)
                                    .and_then(|v| v.to_str().ok())
                                    .and_then(|v| v.parse::<u64>().ok());
                                remote_len == Some(cached_len)
                            } else {
                                true
                            }
                        }
                        _ => false,
                    }
                }
            }
        })
    }
}

fn cache_err(e: CacheError) -> ServiceError {
    ServiceError::comm_error(e.to_string())
}

fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NoopCache;
    use dashmap_lite::MemCache;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    mod dashmap_lite {
        use super::*;
        use std::collections::HashMap;
        use std::sync::Mutex;

        #[derive(Default)]
        pub struct MemCache(Mutex<HashMap<String, String>>);

        #[async_trait::async_trait]
        impl Cache for MemCache {
            async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
                Ok(self.0.lock().unwrap().get(key).cloned())
            }
            async fn set(&self, key: &str, value: &str, _ttl: Duration) -> Result<(), CacheError> {
                self.0.lock().unwrap().insert(key.to_string(), value.to_string());
                Ok(())
            }
            async fn delete(&self, key: &str) -> Result<(), CacheError> {
                self.0.lock().unwrap().remove(key);
                Ok(())
            }
            async fn flush(&self) -> Result<(), CacheError> {
                self.0.lock().unwrap().clear();
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn disabled_cache_always_computes() {
        let control = CacheControl::new(Arc::new(NoopCache), Duration::from_secs(60));
        let metadata = Metadata::new("test");
        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let calls = calls.clone();
            control
                .call(&metadata, false, "key", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::from(1))
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn second_call_is_a_hit() {
        let control = CacheControl::new(Arc::new(MemCache::default()), Duration::from_secs(60));
        let metadata = Metadata::new("test");
        let calls = Arc::new(AtomicUsize::new(0));

        let c = calls.clone();
        let first = control
            .call(&metadata, true, "key", || async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(Value::from(42))
            })
            .await
            .unwrap();

        let c = calls.clone();
        let second = control
            .call(&metadata, true, "key", || async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(Value::from(42))
            })
            .await
            .unwrap();

        assert_eq!(first, Value::from(42));
        assert_eq!(second, Value::from(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
