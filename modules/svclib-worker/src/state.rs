use std::sync::Arc;

use svclib_context::Invoker;
use svclib_store::{Results, Scratch};

use crate::table::ServiceTable;

pub struct WorkerState {
    pub services: ServiceTable,
    pub results: Arc<dyn Results>,
    pub scratch: Arc<dyn Scratch>,
    pub num_worker_threads: usize,
    pub max_num_fds: u64,
    /// How a service's `ServiceContext::invoke` reaches other services —
    /// normally a `svclib_client::Broker` sharing this worker's registry.
    pub invoker: Arc<dyn Invoker>,
}
