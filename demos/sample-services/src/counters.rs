use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};

use svclib_context::{Service, ServiceContext};
use svclib_core::ServiceError;

/// A stateful service instance: `counter(n)` adds `n` to a running total
/// and returns it. Two instances are registered under different names to
/// show the same struct backing independent named services.
pub struct Counter {
    total: AtomicI64,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            total: AtomicI64::new(0),
        }
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Service for Counter {
    async fn execute(
        &self,
        _ctx: &ServiceContext,
        args: &[Value],
        _kwargs: &Map<String, Value>,
    ) -> Result<Value, ServiceError> {
        let delta = args
            .first()
            .and_then(Value::as_i64)
            .ok_or_else(|| ServiceError::bad_request("expected an integer amount"))?;
        let total = self.total.fetch_add(delta, Ordering::SeqCst) + delta;
        Ok(Value::from(total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context;

    #[tokio::test]
    async fn accumulates_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let counter = Counter::new();
        let first = counter.execute(&ctx, &[Value::from(3)], &Map::new()).await.unwrap();
        let second = counter.execute(&ctx, &[Value::from(4)], &Map::new()).await.unwrap();
        assert_eq!(first, Value::from(3));
        assert_eq!(second, Value::from(7));
    }

    #[tokio::test]
    async fn rejects_non_integer_amount() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let counter = Counter::new();
        let err = counter
            .execute(&ctx, &[Value::String("nope".into())], &Map::new())
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 400);
    }
}
