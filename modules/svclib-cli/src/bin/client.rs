//! Calls a single service and prints its result, the counterpart of
//! `cmd/client.py`.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::{Map, Value};

use svclib_client::Broker;
use svclib_config::AppConfig;
use svclib_registry::RedisRegistry;

#[derive(Parser)]
#[command(name = "svclib-client", about = "Call a registered service and print its result")]
struct Cli {
    /// Name of the service to call
    service: String,

    /// Positional parameters, each parsed as JSON
    params: Vec<String>,

    /// Seconds to wait for the call to finish (default: wait forever)
    #[arg(long)]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    svclib_cli::logging::configure("info");

    let mut args = Vec::with_capacity(cli.params.len());
    for param in &cli.params {
        match serde_json::from_str::<Value>(param) {
            Ok(v) => args.push(v),
            Err(e) => {
                eprintln!("invalid JSON parameter '{param}': {e}");
                return ExitCode::from(1);
            }
        }
    }

    if let Err(e) = run(cli.service, args, cli.timeout).await {
        eprintln!("{e}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

async fn run(service: String, args: Vec<Value>, timeout_secs: Option<u64>) -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    let registry = Arc::new(RedisRegistry::connect(&config.redis_url).await?);
    let broker = Broker::new(registry);

    let call = broker.execute(&service, args, Map::new()).await?;
    let result = call.result(timeout_secs.map(Duration::from_secs)).await?;
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}
