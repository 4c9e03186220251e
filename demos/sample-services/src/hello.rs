use async_trait::async_trait;
use serde_json::{Map, Value};

use svclib_context::{Service, ServiceContext};
use svclib_core::ServiceError;

/// `hello(name) -> "Hello, <name>!"`
pub struct Hello;

#[async_trait]
impl Service for Hello {
    async fn execute(
        &self,
        _ctx: &ServiceContext,
        args: &[Value],
        _kwargs: &Map<String, Value>,
    ) -> Result<Value, ServiceError> {
        let name = args
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::bad_request("expected a name argument"))?;
        Ok(Value::String(format!("Hello, {name}!")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context;

    #[tokio::test]
    async fn greets_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let args = vec![Value::String("World".into())];
        let result = Hello.execute(&ctx, &args, &Map::new()).await.unwrap();
        assert_eq!(result, Value::String("Hello, World!".into()));
    }

    #[tokio::test]
    async fn rejects_missing_name() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let err = Hello.execute(&ctx, &[], &Map::new()).await.unwrap_err();
        assert_eq!(err.http_status(), 400);
    }
}
