use async_trait::async_trait;
use serde_json::{json, Map, Value};

use svclib_context::{Service, ServiceContext};
use svclib_core::ServiceError;

/// `dump_request(*args) -> {"args": [...], "metadata": {...}}`, useful for
/// poking at what a client actually sent.
pub struct DumpRequest;

#[async_trait]
impl Service for DumpRequest {
    async fn execute(
        &self,
        ctx: &ServiceContext,
        args: &[Value],
        _kwargs: &Map<String, Value>,
    ) -> Result<Value, ServiceError> {
        Ok(json!({
            "args": args,
            "metadata": ctx.metadata().as_value(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context;

    #[tokio::test]
    async fn echoes_args_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let args = vec![Value::from(1), Value::String("two".into())];
        let result = DumpRequest.execute(&ctx, &args, &Map::new()).await.unwrap();
        assert_eq!(result["args"], Value::Array(args));
        assert!(result["metadata"].is_object());
    }
}
