//! A real worker hosting every sample service, as opposed to the generic,
//! empty-table launcher in `svclib-cli`. This is what a deployment's own
//! worker binary looks like once it has actual services to register.

use std::process::ExitCode;
use std::sync::Arc;

use sysinfo::System;

use svclib_client::Broker;
use svclib_config::AppConfig;
use svclib_registry::RedisRegistry;
use svclib_store::{DefaultScratch, LocalFileResults};
use svclib_worker::{ServiceTable, WorkerState};

use sample_services::cache_demo::{default_cache, MockPreload, MockRetrieve};
use sample_services::counters::Counter;
use sample_services::df::Df;
use sample_services::dump_request::DumpRequest;
use sample_services::greetings::{Bonjour, Hola};
use sample_services::hello::Hello;
use sample_services::proxy::{Echo, Proxy};
use sample_services::raise::{Raise, RaiseApi};
use sample_services::sleep::{Sleep, SleepTest};
use sample_services::tar::{TarCreate, TarList};

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

    let home = std::path::PathBuf::from(".");
    let cache = default_cache();
    let mut services = ServiceTable::new();
    services
        .register("hello", home.clone(), Arc::new(Hello))
        .register("dump_request", home.clone(), Arc::new(DumpRequest))
        .register("raise", home.clone(), Arc::new(Raise))
        .register("raise-api", home.clone(), Arc::new(RaiseApi))
        .register("sleep", home.clone(), Arc::new(Sleep))
        .register("sleep-test", home.clone(), Arc::new(SleepTest))
        .register("df", home.clone(), Arc::new(Df))
        .register("tar-create", home.clone(), Arc::new(TarCreate))
        .register("tar-list", home.clone(), Arc::new(TarList))
        .register(
            "mock_preload",
            home.clone(),
            Arc::new(MockPreload::short(cache.clone())),
        )
        .register(
            "mock_preload_long_ttl",
            home.clone(),
            Arc::new(MockPreload::long_ttl(cache.clone())),
        )
        .register("mock_retrieve", home.clone(), Arc::new(MockRetrieve::new(cache)))
        .register("counter-1", home.clone(), Arc::new(Counter::new()))
        .register("counter-2", home.clone(), Arc::new(Counter::new()))
        .register("hola", home.clone(), Arc::new(Hola))
        .register("bonjour", home.clone(), Arc::new(Bonjour))
        .register("echo", home.clone(), Arc::new(Echo))
        .register("proxy", home, Arc::new(Proxy));

    let registry = Arc::new(RedisRegistry::connect(&config.redis_url).await?);
    let state = Arc::new(WorkerState {
        services,
        results: Arc::new(LocalFileResults::new(vec![result_dir])),
        scratch: Arc::new(DefaultScratch::new(vec![scratch_dir])?),
        num_worker_threads: config.num_worker_threads,
        max_num_fds: 1024,
        invoker: Arc::new(Broker::new(registry.clone())),
    });

    svclib_worker::run(addr, &base_url, state, registry, Vec::new()).await
}
