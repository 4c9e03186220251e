use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use svclib_context::{Service, ServiceContext};
use svclib_core::ServiceError;
use svclib_process::{ProcessHandler, ProcessSpec};

fn seconds_arg(args: &[Value]) -> Result<u64, ServiceError> {
    args.first()
        .and_then(Value::as_u64)
        .ok_or_else(|| ServiceError::bad_request("expected a number of seconds"))
}

/// `sleep(n)`: sleeps for `n` seconds in-process and returns `n`.
pub struct Sleep;

#[async_trait]
impl Service for Sleep {
    async fn execute(
        &self,
        _ctx: &ServiceContext,
        args: &[Value],
        _kwargs: &Map<String, Value>,
    ) -> Result<Value, ServiceError> {
        let n = seconds_arg(args)?;
        tokio::time::sleep(Duration::from_secs(n)).await;
        Ok(Value::from(n))
    }
}

struct SleepHandler;

impl ProcessHandler for SleepHandler {
    fn results(&mut self, _output: &[u8]) -> Result<Value, ServiceError> {
        Ok(Value::Null)
    }
}

/// `sleep-test(n)`: same as [`Sleep`] but shells out to the `sleep(1)`
/// binary, exercising the subprocess plumbing instead of `tokio::time`.
pub struct SleepTest;

#[async_trait]
impl Service for SleepTest {
    async fn execute(
        &self,
        ctx: &ServiceContext,
        args: &[Value],
        _kwargs: &Map<String, Value>,
    ) -> Result<Value, ServiceError> {
        let n = seconds_arg(args)?;
        let spec = ProcessSpec::new("sleep", vec!["sleep".to_string(), n.to_string()]);
        ctx.spawn_process(&spec, &mut SleepHandler).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context;

    #[tokio::test]
    async fn sleeps_and_echoes_duration() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let result = Sleep.execute(&ctx, &[Value::from(0)], &Map::new()).await.unwrap();
        assert_eq!(result, Value::from(0));
    }

    #[tokio::test]
    async fn rejects_non_numeric_argument() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let err = Sleep
            .execute(&ctx, &[Value::String("soon".into())], &Map::new())
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 400);
    }
}
