//! The handle returned for a dispatched call: runs in the background,
//! observable from one or more `wait()` calls.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex, Notify};

use svclib_core::{Metadata, Request, Response, ServiceError};

#[derive(Clone)]
struct Outcome {
    value: Result<Value, ServiceError>,
    metadata: Metadata,
}

struct Shared {
    outcome: Mutex<Option<Outcome>>,
    notify: Notify,
}

/// A call in flight (or already finished). Cheap to clone; every clone
/// observes the same eventual outcome. A `wait()` that times out does
/// *not* cancel the underlying request — a later `wait()` on the same (or
/// a cloned) handle can still observe it finishing.
#[derive(Clone)]
pub struct ClientCall {
    shared: Arc<Shared>,
    url: String,
    #[allow(dead_code)]
    task: Arc<tokio::task::JoinHandle<()>>,
}

impl ClientCall {
    pub(crate) fn spawn(http: reqwest::Client, url: String, req: Request) -> Self {
        let shared = Arc::new(Shared {
            outcome: Mutex::new(None),
            notify: Notify::new(),
        });
        let worker_shared = shared.clone();
        let worker_url = url.clone();
        let task = tokio::spawn(async move {
            let outcome = run_call(&http, &worker_url, &req).await;
            *worker_shared.outcome.lock().await = Some(outcome);
            worker_shared.notify.notify_waiters();
        });
        Self {
            shared,
            url,
            task: Arc::new(task),
        }
    }

    /// Blocks (asynchronously) until the call finishes, or `timeout`
    /// elapses. A `None` timeout waits indefinitely.
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<(Value, Metadata), ServiceError> {
        loop {
            let notified = self.shared.notify.notified();
            if let Some(outcome) = self.shared.outcome.lock().await.clone() {
                return outcome.value.map(|v| (v, outcome.metadata));
            }
            match timeout {
                None => notified.await,
                Some(d) => {
                    tokio::select! {
                        _ = notified => {}
                        _ = tokio::time::sleep(d) => {
                            return Err(ServiceError::timeout(format!(
                                "timed out waiting for {}",
                                self.url
                            )));
                        }
                    }
                }
            }
        }
    }

    pub async fn result(&self, timeout: Option<Duration>) -> Result<Value, ServiceError> {
        self.wait(timeout).await.map(|(v, _)| v)
    }

    pub async fn metadata(&self, timeout: Option<Duration>) -> Result<Metadata, ServiceError> {
        self.wait(timeout).await.map(|(_, m)| m)
    }
}

async fn run_call(http: &reqwest::Client, url: &str, req: &Request) -> Outcome {
    let metadata = Metadata::unnamed();
    let send = async {
        let resp = http
            .post(url)
            .body(req.http_body())
            .headers(to_header_map(req.http_headers()))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::timeout(format!("request to {url} timed out"))
                } else {
                    ServiceError::comm_error(e.to_string())
                }
            })?;
        let status = resp.status().as_u16();
        let headers = from_header_map(resp.headers());
        let body = resp.bytes().await.map_err(|e| ServiceError::comm_error(e.to_string()))?;
        Response::from_http(status, &body, &headers)
    }
    .await;

    match send {
        Ok(response) => Outcome {
            value: response.outcome,
            metadata: response.metadata,
        },
        Err(e) => Outcome { value: Err(e), metadata },
    }
}

fn to_header_map(headers: std::collections::HashMap<String, String>) -> reqwest::header::HeaderMap {
    let mut map = reqwest::header::HeaderMap::new();
    for (k, v) in headers {
        if let (Ok(name), Ok(value)) = (
            reqwest::header::HeaderName::from_bytes(k.as_bytes()),
            reqwest::header::HeaderValue::from_str(&v),
        ) {
            map.insert(name, value);
        }
    }
    map
}

fn from_header_map(headers: &reqwest::header::HeaderMap) -> std::collections::HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect()
}
