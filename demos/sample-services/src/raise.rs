use async_trait::async_trait;
use serde_json::{Map, Value};

use svclib_context::{Service, ServiceContext};
use svclib_core::ServiceError;

fn value_to_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Builds the error a given `exc_name` would raise in the original, the
/// cases it special-cased (`BadRequest`, `RetryLater`) mapped onto their
/// `ServiceError` counterparts, anything else folded into a generic
/// service error carrying the requested exception name as context.
fn build_error(exc_name: &str, exc_args: &[Value]) -> ServiceError {
    let message = exc_args.iter().map(value_to_text).collect::<Vec<_>>().join(", ");
    match exc_name {
        "BadRequest" => ServiceError::bad_request(message),
        "RetryLater" => {
            let delay = exc_args.get(1).and_then(Value::as_i64).unwrap_or(1);
            ServiceError::retry_later(message, delay)
        }
        other => ServiceError::service_error(format!("{other}: {message}")),
    }
}

/// `raise(exc_name, *exc_args)`: always fails, with the error shaped by
/// `exc_name`. Used to exercise client-side error handling.
pub struct Raise;

#[async_trait]
impl Service for Raise {
    async fn execute(
        &self,
        _ctx: &ServiceContext,
        args: &[Value],
        _kwargs: &Map<String, Value>,
    ) -> Result<Value, ServiceError> {
        let exc_name = args
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::bad_request("expected an exception name"))?;
        Err(build_error(exc_name, &args[1..]))
    }
}

/// `raise-api({"exc_name": ..., "exc_args": [...]})`, the single-object
/// variant of [`Raise`].
pub struct RaiseApi;

#[async_trait]
impl Service for RaiseApi {
    async fn execute(
        &self,
        _ctx: &ServiceContext,
        args: &[Value],
        _kwargs: &Map<String, Value>,
    ) -> Result<Value, ServiceError> {
        let request = args
            .first()
            .ok_or_else(|| ServiceError::bad_request("expected a request object"))?;
        let exc_name = request
            .get("exc_name")
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::bad_request("request missing 'exc_name'"))?;
        let exc_args = request
            .get("exc_args")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Err(build_error(exc_name, &exc_args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context;
    use serde_json::json;

    #[tokio::test]
    async fn bad_request_maps_to_400() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let args = vec![Value::String("BadRequest".into()), Value::String("nope".into())];
        let err = Raise.execute(&ctx, &args, &Map::new()).await.unwrap_err();
        assert_eq!(err.http_status(), 400);
        assert_eq!(err.message(), "nope");
    }

    #[tokio::test]
    async fn retry_later_carries_delay() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let args = vec![
            Value::String("RetryLater".into()),
            Value::String("try again".into()),
            Value::from(5),
        ];
        let err = Raise.execute(&ctx, &args, &Map::new()).await.unwrap_err();
        assert_eq!(err.retry(), svclib_core::errors::Retry::After(5));
    }

    #[tokio::test]
    async fn unknown_name_falls_back_to_service_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let args = vec![Value::String("CustomError".into()), Value::String("boom".into())];
        let err = Raise.execute(&ctx, &args, &Map::new()).await.unwrap_err();
        assert_eq!(err.http_status(), 500);
    }

    #[tokio::test]
    async fn raise_api_unpacks_request_object() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let args = vec![json!({"exc_name": "BadRequest", "exc_args": ["field missing"]})];
        let err = RaiseApi.execute(&ctx, &args, &Map::new()).await.unwrap_err();
        assert_eq!(err.http_status(), 400);
    }
}
