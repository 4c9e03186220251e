use async_trait::async_trait;
use serde_json::{Map, Value};

use svclib_context::{Service, ServiceContext};
use svclib_core::ServiceError;

fn name_arg(args: &[Value]) -> Result<&str, ServiceError> {
    args.first()
        .and_then(Value::as_str)
        .ok_or_else(|| ServiceError::bad_request("expected a name argument"))
}

/// `hola(name) -> "Hola, <name>!"`
pub struct Hola;

#[async_trait]
impl Service for Hola {
    async fn execute(
        &self,
        _ctx: &ServiceContext,
        args: &[Value],
        _kwargs: &Map<String, Value>,
    ) -> Result<Value, ServiceError> {
        Ok(Value::String(format!("Hola, {}!", name_arg(args)?)))
    }
}

/// `bonjour(name) -> "Bonjour, <name>!"`
pub struct Bonjour;

#[async_trait]
impl Service for Bonjour {
    async fn execute(
        &self,
        _ctx: &ServiceContext,
        args: &[Value],
        _kwargs: &Map<String, Value>,
    ) -> Result<Value, ServiceError> {
        Ok(Value::String(format!("Bonjour, {}!", name_arg(args)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context;

    #[tokio::test]
    async fn hola_greets_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let result = Hola.execute(&ctx, &[Value::String("Ana".into())], &Map::new()).await.unwrap();
        assert_eq!(result, Value::String("Hola, Ana!".into()));
    }

    #[tokio::test]
    async fn bonjour_greets_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let result = Bonjour
            .execute(&ctx, &[Value::String("Claire".into())], &Map::new())
            .await
            .unwrap();
        assert_eq!(result, Value::String("Bonjour, Claire!".into()));
    }
}
