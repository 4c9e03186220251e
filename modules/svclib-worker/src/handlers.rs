use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use svclib_core::Request;

use crate::dispatch::{bad_request, dispatch};
use crate::state::WorkerState;
use crate::stats::{snapshot, StatsConfig};

fn header_map_to_strings(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_lowercase(), v.to_string())))
        .collect()
}

pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn stats(State(state): State<Arc<WorkerState>>) -> impl IntoResponse {
    let config = StatsConfig {
        num_worker_threads: state.num_worker_threads,
        max_num_fds: state.max_num_fds,
    };
    axum::Json(snapshot(&config))
}

pub async fn call_service(
    State(state): State<Arc<WorkerState>>,
    Path(service): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let entry = match state.services.get(&service) {
        Some(entry) => entry,
        None => {
            return (StatusCode::NOT_FOUND, format!("unknown service '{service}'")).into_response();
        }
    };

    if !body.is_empty() {
        let content_type = headers
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !content_type.is_empty() && !content_type.contains("application/json") {
            tracing::error!(service, content_type, "unsupported request content type");
            return (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported content type").into_response();
        }
    }

    let header_map = header_map_to_strings(&headers);
    let response = match Request::from_http(&body, &header_map) {
        Ok(req) => {
            dispatch(
                &service,
                entry,
                req,
                state.results.clone(),
                state.scratch.clone(),
                state.invoker.clone(),
            )
            .await
        }
        Err(e) => {
            tracing::error!(service, error = %e, "bad request");
            bad_request(e.to_string())
        }
    };

    let status = StatusCode::from_u16(response.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut out = (status, response.http_body()).into_response();
    let resp_headers = out.headers_mut();
    for (k, v) in response.http_headers() {
        if let (Ok(name), Ok(value)) = (
            axum::http::HeaderName::from_bytes(k.as_bytes()),
            axum::http::HeaderValue::from_str(&v),
        ) {
            resp_headers.insert(name, value);
        }
    }
    out
}
