//! Minimal settings backend, reimagined from `cmd/config_server.py` (which
//! just execs `uwsgi` against a WSGI app): an embedded `axum` server
//! exposing a [`ConfigTree`] loaded from a YAML file, writable unless
//! `--read-only` is set.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use serde_json::Value;
use tokio::sync::RwLock;

use svclib_config::ConfigTree;

#[derive(Parser)]
#[command(name = "svclib-config-server")]
struct Cli {
    /// Listening port
    #[arg(long, default_value_t = 9999)]
    port: u16,

    /// Disable updates
    #[arg(long)]
    read_only: bool,

    /// Path to the config file
    #[arg(long, default_value = "servicelib.yaml")]
    config_file: PathBuf,
}

struct AppState {
    tree: RwLock<ConfigTree>,
    config_file: PathBuf,
    read_only: bool,
}

async fn load(path: &PathBuf) -> anyhow::Result<ConfigTree> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(ConfigTree::new(serde_yaml::from_str(&text)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigTree::new(Value::Object(Default::default()))),
        Err(e) => Err(e.into()),
    }
}

async fn persist(state: &AppState) -> anyhow::Result<()> {
    let value = state.tree.read().await.as_value();
    let text = serde_yaml::to_string(&value)?;
    tokio::fs::write(&state.config_file, text).await?;
    Ok(())
}

async fn dump_tree(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let value = state.tree.read().await.as_value();
    let text = serde_yaml::to_string(&value).unwrap_or_default();
    ([("content-type", "application/yaml")], text)
}

fn key_from_path(raw: &str) -> String {
    raw.trim_matches('/').replace('/', ".")
}

async fn set_key(
    State(state): State<Arc<AppState>>,
    Path(raw_key): Path<String>,
    Json(value): Json<Value>,
) -> impl IntoResponse {
    if state.read_only {
        return StatusCode::FORBIDDEN;
    }
    state.tree.write().await.set(&key_from_path(&raw_key), value);
    if let Err(e) = persist(&state).await {
        tracing::error!(error = %e, "failed to persist config");
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    StatusCode::OK
}

async fn delete_key(State(state): State<Arc<AppState>>, Path(raw_key): Path<String>) -> impl IntoResponse {
    if state.read_only {
        return StatusCode::FORBIDDEN;
    }
    let removed = state.tree.write().await.delete(&key_from_path(&raw_key));
    if !removed {
        return StatusCode::NOT_FOUND;
    }
    if let Err(e) = persist(&state).await {
        tracing::error!(error = %e, "failed to persist config");
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    StatusCode::OK
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    svclib_cli::logging::configure("info");

    if let Err(e) = run(cli).await {
        eprintln!("{e}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let tree = load(&cli.config_file).await?;
    let state = Arc::new(AppState {
        tree: RwLock::new(tree),
        config_file: cli.config_file,
        read_only: cli.read_only,
    });

    let router = Router::new()
        .route("/", get(dump_tree))
        .route("/{*key}", axum::routing::post(set_key).delete(delete_key))
        .with_state(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, read_only = cli.read_only, "config server listening");
    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}
