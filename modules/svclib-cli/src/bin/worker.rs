//! Generic worker launcher, reimagined from `cmd/worker.py` (which execs
//! `uwsgi` against whatever Python module happens to define `execute()`).
//! Rust has no equivalent of discovering a service's handler code at
//! startup, so this binary hosts an empty [`ServiceTable`] by default —
//! a real deployment builds its own table of [`svclib_context::Service`]
//! implementations and calls [`svclib_worker::run`] directly, the way
//! `demos/sample-services` does.

use std::process::ExitCode;
use std::sync::Arc;

use sysinfo::System;

use svclib_client::Broker;
use svclib_config::AppConfig;
use svclib_registry::RedisRegistry;
use svclib_store::{DefaultScratch, LocalFileResults};
use svclib_worker::{ServiceTable, WorkerState};

#[tokio::main]
async fn main() -> ExitCode {
    svclib_cli::logging::configure("info");
    if let Err(e) = run().await {
        eprintln!("{e}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::worker_from_env();
    config.log_redacted();

    let addr: std::net::SocketAddr = config.bind_addr.parse()?;
    let host = System::host_name().unwrap_or_else(|| "localhost".to_string());
    let base_url = format!("http://{host}:{}", addr.port());

    let result_dir = std::path::PathBuf::from(
        std::env::var("SERVICELIB_RESULT_DIR").unwrap_or_else(|_| "./var/results".to_string()),
    );
    let scratch_dir = std::path::PathBuf::from(
        std::env::var("SERVICELIB_SCRATCH_DIR").unwrap_or_else(|_| "./var/scratch".to_string()),
    );
    tokio::fs::create_dir_all(&result_dir).await?;
    tokio::fs::create_dir_all(&scratch_dir).await?;

    let registry = Arc::new(RedisRegistry::connect(&config.redis_url).await?);
    let state = Arc::new(WorkerState {
        services: ServiceTable::new(),
        results: Arc::new(LocalFileResults::new(vec![result_dir])),
        scratch: Arc::new(DefaultScratch::new(vec![scratch_dir])?),
        num_worker_threads: config.num_worker_threads,
        max_num_fds: 1024,
        invoker: Arc::new(Broker::new(registry.clone())),
    });

    svclib_worker::run(addr, &base_url, state, registry, Vec::new()).await
}
