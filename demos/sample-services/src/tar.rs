use async_trait::async_trait;
use serde_json::{Map, Value};

use svclib_context::{Service, ServiceContext};
use svclib_core::ServiceError;
use svclib_process::{ProcessHandler, ProcessSpec};

struct NullHandler;

impl ProcessHandler for NullHandler {
    fn results(&mut self, _output: &[u8]) -> Result<Value, ServiceError> {
        Ok(Value::Null)
    }
}

fn string_args(args: &[Value]) -> Result<Vec<String>, ServiceError> {
    args.iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| ServiceError::bad_request("expected string arguments"))
        })
        .collect()
}

/// `tar-create(*paths)`: tars the given paths into a new result and
/// returns its descriptor. Marks the result's path as accessed before
/// spawning so `length()` reports the size `tar` actually wrote rather
/// than the zero bytes this service itself wrote through `FileResult`.
pub struct TarCreate;

#[async_trait]
impl Service for TarCreate {
    async fn execute(
        &self,
        ctx: &ServiceContext,
        args: &[Value],
        _kwargs: &Map<String, Value>,
    ) -> Result<Value, ServiceError> {
        let paths = string_args(args)?;
        let mut result = ctx.create_result("application/x-tar").await?;
        let dest = result.path().to_path_buf();

        let mut cmdline = vec!["tar".to_string(), "cvf".to_string(), dest.display().to_string()];
        cmdline.extend(paths);
        let spec = ProcessSpec::new("tar", cmdline);
        ctx.spawn_process(&spec, &mut NullHandler).await?;

        result
            .as_value()
            .await
            .map_err(|e| ServiceError::service_error(e.to_string()))
    }
}

struct TarListHandler;

impl ProcessHandler for TarListHandler {
    fn results(&mut self, output: &[u8]) -> Result<Value, ServiceError> {
        Ok(Value::String(String::from_utf8_lossy(output).into_owned()))
    }
}

/// `tar-list(result)`: lists the contents of a tar result produced
/// elsewhere (possibly by [`TarCreate`]).
pub struct TarList;

#[async_trait]
impl Service for TarList {
    async fn execute(
        &self,
        ctx: &ServiceContext,
        args: &[Value],
        _kwargs: &Map<String, Value>,
    ) -> Result<Value, ServiceError> {
        let result = args
            .first()
            .ok_or_else(|| ServiceError::bad_request("expected a result descriptor"))?;
        let path = ctx.get_data(result).await?;
        let spec = ProcessSpec::new("tar", vec!["tar".to_string(), "tvf".to_string(), path.display().to_string()]);
        ctx.spawn_process(&spec, &mut TarListHandler).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context;

    #[tokio::test]
    async fn rejects_non_string_paths() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let err = TarCreate.execute(&ctx, &[Value::from(1)], &Map::new()).await.unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[tokio::test]
    async fn tar_list_rejects_missing_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let err = TarList.execute(&ctx, &[], &Map::new()).await.unwrap_err();
        assert_eq!(err.http_status(), 400);
    }
}
