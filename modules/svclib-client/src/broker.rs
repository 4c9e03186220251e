//! Dispatches calls to named services, resolving each one's URL through a
//! [`Registry`] and running it through a [`ClientContext`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use svclib_context::{Context, ClientContext, Invoker};
use svclib_core::{Metadata, Request, ServiceError};
use svclib_registry::Registry;

use crate::call::ClientCall;
use crate::check::check_args;

pub struct Broker {
    http: reqwest::Client,
    registry: Arc<dyn Registry>,
    context: Option<ClientContext>,
}

impl Broker {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self {
            http: reqwest::Client::new(),
            registry,
            context: None,
        }
    }

    /// Binds every call made through this broker to a single, shared
    /// client context (same tracker/uid for every call) instead of
    /// generating a fresh one per call.
    pub fn with_context(registry: Arc<dyn Registry>, context: ClientContext) -> Self {
        Self {
            http: reqwest::Client::new(),
            registry,
            context: Some(context),
        }
    }

    fn client_name() -> String {
        std::env::args()
            .next()
            .and_then(|p| {
                std::path::Path::new(&p)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "client".to_string())
    }

    pub async fn execute(
        &self,
        service: &str,
        args: Vec<Value>,
        mut kwargs: Map<String, Value>,
    ) -> Result<ClientCall, ServiceError> {
        let owned_context;
        let context = match &self.context {
            Some(c) => c,
            None => {
                owned_context = ClientContext::new(Self::client_name(), &kwargs);
                &owned_context
            }
        };
        context.pre_execute_hook(&mut kwargs);

        check_args(&Value::Array(args.clone()))?;
        check_args(&Value::Object(kwargs.clone()))?;

        let local_only = kwargs
            .remove("local_only")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let url = self
            .registry
            .service_url(service, local_only)
            .await
            .map_err(|e| ServiceError::comm_error(e.to_string()))?;

        let req = Request::new(args, kwargs);
        Ok(ClientCall::spawn(self.http.clone(), url, req))
    }
}

/// Lets a [`svclib_context::ServiceContext`] reach other services through
/// `invoke()` without this crate's `ClientContext`/`Broker` types leaking
/// into `svclib-context` itself.
#[async_trait]
impl Invoker for Broker {
    async fn invoke(
        &self,
        service: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<(Value, Metadata), ServiceError> {
        let call = self.execute(service, args, kwargs).await?;
        call.wait(None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svclib_registry::MemoryRegistry;

    #[tokio::test]
    async fn execute_fails_fast_when_service_is_unregistered() {
        let registry = Arc::new(MemoryRegistry::new());
        let broker = Broker::new(registry);
        let err = broker
            .execute("nonexistent", vec![], Map::new())
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 503);
    }
}
