//! Worker-side HTTP surface: dispatches `POST /services/:name` to a
//! registered [`Service`], answers `/health` and `/stats`, and serves
//! result directories as static files. Ported from `falcon.py` / the
//! `cmd/worker.py` wiring, with `axum` standing in for Falcon/WSGI.

pub mod dispatch;
pub mod handlers;
pub mod state;
pub mod stats;
pub mod table;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use svclib_registry::Registry;

pub use state::WorkerState;
pub use table::ServiceTable;

fn build_router(state: Arc<WorkerState>, static_mounts: &[(String, PathBuf)]) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route("/stats", get(handlers::stats))
        .route("/services/{service}", post(handlers::call_service));

    for (prefix, dir) in static_mounts {
        router = router.nest_service(prefix, ServeDir::new(dir));
    }

    router
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!("http_request", method = %request.method(), path = %request.uri().path())
            }),
        )
}

/// Registers every service in `state.services` against `registry` under
/// `{base_url}/services/{name}`, serves HTTP until a Ctrl-C / SIGTERM, then
/// unregisters. Registration failures abort before the listener is bound,
/// so `/health` never becomes reachable for a worker the registry doesn't
/// know about.
pub async fn run(
    addr: SocketAddr,
    base_url: &str,
    state: Arc<WorkerState>,
    registry: Arc<dyn Registry>,
    static_mounts: Vec<(String, PathBuf)>,
) -> anyhow::Result<()> {
    let entries: Vec<(String, String)> = state
        .services
        .names()
        .map(|name| (name.to_string(), format!("{base_url}/services/{name}")))
        .collect();

    registry
        .register(&entries)
        .await
        .map_err(|e| anyhow::anyhow!("failed to register services: {e}"))?;
    tracing::info!(count = entries.len(), "registered services");

    let router = build_router(state, &static_mounts);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "worker listening");

    let serve = axum::serve(listener, router.into_make_service());
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    if let Err(e) = serve.with_graceful_shutdown(shutdown).await {
        tracing::error!(error = %e, "server error");
    }

    if let Err(e) = registry.unregister(&entries).await {
        tracing::warn!(error = %e, "failed to unregister services on shutdown");
    }

    Ok(())
}
