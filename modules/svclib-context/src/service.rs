//! The trait a worker-hosted handler implements, and the table that maps
//! service names to instances of it.

use async_trait::async_trait;
use serde_json::{Map, Value};

use svclib_core::ServiceError;

use crate::service_context::ServiceContext;

/// One callable unit of work, analogous to the original's bare `execute`
/// function per service module — bundled into a trait object here so a
/// worker can hold a heterogeneous, explicitly-registered table of them
/// instead of discovering modules on disk at startup.
#[async_trait]
pub trait Service: Send + Sync {
    async fn execute(
        &self,
        ctx: &ServiceContext,
        args: &[Value],
        kwargs: &Map<String, Value>,
    ) -> Result<Value, ServiceError>;
}
