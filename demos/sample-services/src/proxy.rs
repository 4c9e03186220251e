use async_trait::async_trait;
use serde_json::{Map, Value};

use svclib_context::{Service, ServiceContext};
use svclib_core::ServiceError;

/// `echo(x) -> x`. The leaf of the `proxy` chain.
pub struct Echo;

#[async_trait]
impl Service for Echo {
    async fn execute(
        &self,
        _ctx: &ServiceContext,
        args: &[Value],
        _kwargs: &Map<String, Value>,
    ) -> Result<Value, ServiceError> {
        Ok(args.first().cloned().unwrap_or(Value::Null))
    }
}

/// `proxy(target, *args)`: forwards to `target` through
/// [`ServiceContext::invoke`], nesting this call's metadata as a child of
/// its own. Exists to exercise the context's outbound call path end to
/// end, the way `raise` exercises error propagation.
pub struct Proxy;

#[async_trait]
impl Service for Proxy {
    async fn execute(
        &self,
        ctx: &ServiceContext,
        args: &[Value],
        _kwargs: &Map<String, Value>,
    ) -> Result<Value, ServiceError> {
        let target = args
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::bad_request("expected a target service name"))?;
        ctx.invoke(target, args[1..].to_vec(), Map::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context, StubInvoker};
    use std::sync::Arc;

    #[tokio::test]
    async fn echo_returns_its_argument() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let result = Echo.execute(&ctx, &[Value::from(7)], &Map::new()).await.unwrap();
        assert_eq!(result, Value::from(7));
    }

    #[tokio::test]
    async fn proxy_rejects_missing_target() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let err = Proxy.execute(&ctx, &[], &Map::new()).await.unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[tokio::test]
    async fn proxy_forwards_remaining_args_and_nests_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = Arc::new(StubInvoker::echoing());
        let ctx = crate::test_support::context_with_invoker(dir.path(), invoker.clone());

        let args = vec![Value::String("echo".into()), Value::String("foo".into())];
        let result = Proxy.execute(&ctx, &args, &Map::new()).await.unwrap();
        assert_eq!(result, Value::String("foo".into()));

        let calls = invoker.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "echo");
        assert_eq!(calls[0].1, vec![Value::String("foo".into())]);

        let value = ctx.metadata().as_value();
        assert_eq!(value["kids"].as_array().unwrap().len(), 1);
        assert_eq!(value["kids"][0]["task"], Value::String("echo".into()));
    }
}
