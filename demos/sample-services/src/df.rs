use async_trait::async_trait;
use serde_json::{Map, Value};

use svclib_context::{Service, ServiceContext};
use svclib_core::ServiceError;
use svclib_process::{ProcessHandler, ProcessSpec};

struct DfHandler;

impl ProcessHandler for DfHandler {
    fn results(&mut self, output: &[u8]) -> Result<Value, ServiceError> {
        Ok(Value::String(String::from_utf8_lossy(output).into_owned()))
    }
}

/// `df(*args) -> output of "df <args>"`, the canonical spawn-and-capture
/// sample.
pub struct Df;

#[async_trait]
impl Service for Df {
    async fn execute(
        &self,
        ctx: &ServiceContext,
        args: &[Value],
        _kwargs: &Map<String, Value>,
    ) -> Result<Value, ServiceError> {
        let mut cmdline = vec!["df".to_string()];
        for arg in args {
            let text = arg
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| ServiceError::bad_request("expected string arguments"))?;
            cmdline.push(text);
        }
        let spec = ProcessSpec::new("df", cmdline);
        ctx.spawn_process(&spec, &mut DfHandler).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context;

    #[tokio::test]
    async fn rejects_non_string_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let err = Df.execute(&ctx, &[Value::from(1)], &Map::new()).await.unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[tokio::test]
    async fn runs_df_and_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let result = Df.execute(&ctx, &[Value::String("-h".into())], &Map::new()).await.unwrap();
        assert!(result.as_str().is_some_and(|s| !s.is_empty()));
    }
}
