use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use svclib_cache::{Cache, CacheControl, NoopCache};
use svclib_context::{Service, ServiceContext};
use svclib_core::ServiceError;

const SHORT_TTL: Duration = Duration::from_secs(1);
const LONG_TTL: Duration = Duration::from_secs(86_400);

/// `mock_preload(request)`: echoes `request` back under `CacheControl`,
/// optionally sleeping first if `request["delay"]` is set, to make the
/// cache-vs-recompute distinction observable between two calls.
pub struct MockPreload {
    name: &'static str,
    control: CacheControl,
}

impl MockPreload {
    /// `mock_preload`: a short TTL, so a repeat call past one second
    /// recomputes.
    pub fn short(cache: Arc<dyn Cache>) -> Self {
        Self {
            name: "mock_preload",
            control: CacheControl::new(cache, SHORT_TTL),
        }
    }

    /// `mock_preload_long_ttl`: effectively never expires within a demo
    /// session, so a repeat call is always a hit.
    pub fn long_ttl(cache: Arc<dyn Cache>) -> Self {
        Self {
            name: "mock_preload_long_ttl",
            control: CacheControl::new(cache, LONG_TTL),
        }
    }
}

#[async_trait]
impl Service for MockPreload {
    async fn execute(
        &self,
        ctx: &ServiceContext,
        args: &[Value],
        _kwargs: &Map<String, Value>,
    ) -> Result<Value, ServiceError> {
        let request = args.first().cloned().unwrap_or(Value::Null);
        let cache_key = ctx.request().cache_key(self.name);
        let cache_enabled = ctx.request().cache_enabled();
        self.control
            .call(ctx.metadata(), cache_enabled, &cache_key, move || async move {
                if let Some(delay) = request.get("delay").and_then(Value::as_u64) {
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                }
                Ok(json!({ "preload": request }))
            })
            .await
    }
}

/// `mock_retrieve(request)`: builds three small file results under cache
/// control, to exercise caching a payload that itself contains result
/// descriptors.
pub struct MockRetrieve {
    control: CacheControl,
}

impl MockRetrieve {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self {
            control: CacheControl::new(cache, SHORT_TTL),
        }
    }
}

#[async_trait]
impl Service for MockRetrieve {
    async fn execute(
        &self,
        ctx: &ServiceContext,
        args: &[Value],
        _kwargs: &Map<String, Value>,
    ) -> Result<Value, ServiceError> {
        let request = args.first().cloned().unwrap_or(Value::Null);
        let cache_key = ctx.request().cache_key("mock_retrieve");
        let cache_enabled = ctx.request().cache_enabled();
        self.control
            .call(ctx.metadata(), cache_enabled, &cache_key, move || async move {
                let mut items = Vec::new();
                for (i, field) in ["field-1", "field-2", "field-3"].iter().enumerate() {
                    let mut result = ctx.create_result("application/x-grib").await?;
                    result.open().await.map_err(|e| ServiceError::service_error(e.to_string()))?;
                    result
                        .write(field.as_bytes())
                        .await
                        .map_err(|e| ServiceError::service_error(e.to_string()))?;
                    result.close().await.map_err(|e| ServiceError::service_error(e.to_string()))?;
                    let value = result
                        .as_value()
                        .await
                        .map_err(|e| ServiceError::service_error(e.to_string()))?;
                    let _ = i;
                    items.push(json!({ "request": request.clone(), "result": value }));
                }
                Ok(Value::Array(items))
            })
            .await
    }
}

/// A `CacheControl` backed by [`NoopCache`] for demo purposes: it runs the
/// full single-flight machinery and cache-control metadata annotations
/// without needing a Redis instance on hand.
pub fn default_cache() -> Arc<dyn Cache> {
    Arc::new(NoopCache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context;

    #[tokio::test]
    async fn mock_preload_echoes_request() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let svc = MockPreload::short(default_cache());
        let args = vec![json!({"region": "eu"})];
        let result = svc.execute(&ctx, &args, &Map::new()).await.unwrap();
        assert_eq!(result["preload"]["region"], "eu");
    }

    #[tokio::test]
    async fn mock_retrieve_returns_three_results() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let svc = MockRetrieve::new(default_cache());
        let result = svc.execute(&ctx, &[Value::Null], &Map::new()).await.unwrap();
        assert_eq!(result.as_array().unwrap().len(), 3);
    }
}
