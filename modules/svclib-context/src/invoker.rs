//! The outbound half of a call: how a [`crate::ServiceContext`] reaches
//! another service without depending on `svclib-client` directly (which
//! itself depends on this crate for [`crate::ClientContext`] — an
//! `Invoker` is injected rather than imported, to avoid the cycle).

use async_trait::async_trait;
use serde_json::{Map, Value};

use svclib_core::{Metadata, ServiceError};

/// Dispatches a nested call to a named service and returns its result
/// together with the metadata tree the call produced, so the caller can
/// fold it in as a child of its own metadata.
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(
        &self,
        service: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<(Value, Metadata), ServiceError>;
}
