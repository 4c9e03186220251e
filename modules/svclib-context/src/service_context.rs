//! The context passed to a service handler for a single incoming call:
//! where its home directory is, what request it's answering, and the
//! artifact stores it can use to produce or fetch results.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::Mutex as AsyncMutex;

use svclib_core::{Metadata, Request, ServiceError};
use svclib_process::{ProcessHandler, ProcessSpec};
use svclib_store::{FileResult, Results, Scratch};

use crate::context::Context;
use crate::invoker::Invoker;

/// Bound to a single incoming call. Tracks every temp file it creates so
/// [`ServiceContext::cleanup`] can remove them once the handler returns,
/// regardless of whether it succeeded.
pub struct ServiceContext {
    name: String,
    metadata: Metadata,
    home: PathBuf,
    request: Request,
    temp_files: AsyncMutex<Vec<PathBuf>>,
    results: Arc<dyn Results>,
    scratch: Arc<dyn Scratch>,
    invoker: Arc<dyn Invoker>,
}

impl ServiceContext {
    pub fn new(
        name: impl Into<String>,
        home: PathBuf,
        request: Request,
        results: Arc<dyn Results>,
        scratch: Arc<dyn Scratch>,
        invoker: Arc<dyn Invoker>,
    ) -> Self {
        let name = name.into();
        let metadata = Metadata::new(name.clone());
        for (k, v) in &request.kwargs {
            metadata.annotate(k.clone(), v.clone());
        }
        Self {
            name,
            metadata,
            home,
            request,
            temp_files: AsyncMutex::new(Vec::new()),
            results,
            scratch,
            invoker,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn uid(&self) -> Option<String> {
        self.request.uid()
    }

    pub fn tracker(&self) -> String {
        self.request.tracker()
    }

    /// Resolves `fname` relative to this service's home directory (the
    /// directory its handler module/executable lives in).
    pub fn service_home(&self, fname: impl AsRef<Path>) -> PathBuf {
        self.home.join(fname)
    }

    pub async fn create_result(&self, content_type: &str) -> Result<FileResult, ServiceError> {
        self.results
            .create(content_type)
            .await
            .map_err(|e| ServiceError::service_error(e.to_string()))
    }

    /// Allocates a scratch file and remembers it for cleanup.
    pub async fn create_temp_file(&self) -> Result<PathBuf, ServiceError> {
        let path = self
            .scratch
            .create_temp_file()
            .await
            .map_err(|e| ServiceError::service_error(e.to_string()))?;
        self.temp_files.lock().await.push(path.clone());
        Ok(path)
    }

    /// Resolves a result descriptor to a local path: first asks the result
    /// store (cheap, no download, if the result already lives on this
    /// worker's disk), then falls back to the content-addressed scratch
    /// cache (which may download it).
    pub async fn get_data(&self, result: &Value) -> Result<PathBuf, ServiceError> {
        let _t = self.metadata.timer("getdata");
        if let Some(path) = self.results.as_local_file(result).await {
            return Ok(path);
        }
        let _dl = self.metadata.timer("download");
        self.scratch
            .as_local_file(result)
            .await
            .map_err(|e| ServiceError::service_error(e.to_string()))
    }

    /// Runs a subprocess, nesting its own metadata tree as a child of this
    /// call's metadata (matching `ProcessRunner.run`'s shape: the process
    /// gets its own timers/notes, merged in only on success).
    pub async fn spawn_process(
        &self,
        spec: &ProcessSpec,
        handler: &mut dyn ProcessHandler,
    ) -> Result<Value, ServiceError> {
        let proc_metadata = Metadata::new(spec.name.clone());
        let result = svclib_process::run(spec, handler, &proc_metadata).await;
        if result.is_ok() {
            self.metadata.update_metadata(&proc_metadata);
        }
        result
    }

    /// Makes a nested call to another service, the way a handler reaches
    /// out to the rest of the system instead of doing everything itself.
    /// Forwards this call's own kwargs onto the outgoing one (the same
    /// defaulting [`Context::pre_execute_hook`] applies to any nested
    /// call) and merges the nested call's metadata in as a child of this
    /// one, mirroring [`ServiceContext::spawn_process`]'s shape.
    pub async fn invoke(
        &self,
        service: &str,
        args: Vec<Value>,
        mut kwargs: Map<String, Value>,
    ) -> Result<Value, ServiceError> {
        self.pre_execute_hook(&mut kwargs);
        let (value, child_metadata) = self.invoker.invoke(service, args, kwargs).await?;
        self.metadata.update_metadata(&child_metadata);
        Ok(value)
    }

    /// Removes every temp file this context allocated. Failures are
    /// logged and swallowed, matching the original's best-effort cleanup.
    pub async fn cleanup(&self) {
        let mut files = self.temp_files.lock().await;
        for path in files.drain(..) {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove temp file");
                }
            }
        }
    }
}

impl Context for ServiceContext {
    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Unlike `ClientContext`, a service forwards *every* kwarg it itself
    /// received as a default onto any nested call it makes.
    fn pre_execute_hook(&self, kwargs: &mut Map<String, Value>) {
        for (k, v) in &self.request.kwargs {
            kwargs.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use svclib_store::{DefaultScratch, LocalFileResults};

    fn request_with(kwargs: Map<String, Value>) -> Request {
        Request::new(vec![], kwargs)
    }

    /// Records the last call it was asked to make and answers with a
    /// fixed value plus a one-deep child metadata tree, so tests can
    /// assert both what `invoke()` forwarded and that it merged the
    /// result back in.
    struct StubInvoker {
        calls: AsyncMutex<Vec<(String, Vec<Value>, Map<String, Value>)>>,
    }

    impl StubInvoker {
        fn new() -> Self {
            Self {
                calls: AsyncMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Invoker for StubInvoker {
        async fn invoke(
            &self,
            service: &str,
            args: Vec<Value>,
            kwargs: Map<String, Value>,
        ) -> Result<(Value, Metadata), ServiceError> {
            self.calls.lock().await.push((service.to_string(), args, kwargs));
            let child = Metadata::new(service.to_string());
            Ok((Value::from(1), child))
        }
    }

    fn no_invoker() -> Arc<dyn Invoker> {
        Arc::new(StubInvoker::new())
    }

    #[tokio::test]
    async fn cleanup_removes_every_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let results: Arc<dyn Results> = Arc::new(LocalFileResults::new(vec![dir.path().to_path_buf()]));
        let scratch: Arc<dyn Scratch> = Arc::new(DefaultScratch::new(vec![dir.path().to_path_buf()]).unwrap());
        let ctx = ServiceContext::new(
            "svc",
            dir.path().to_path_buf(),
            request_with(Map::new()),
            results,
            scratch,
            no_invoker(),
        );

        let path = ctx.create_temp_file().await.unwrap();
        assert!(tokio::fs::try_exists(&path).await.unwrap());

        ctx.cleanup().await;
        assert!(!tokio::fs::try_exists(&path).await.unwrap());
    }

    #[tokio::test]
    async fn pre_execute_hook_forwards_all_request_kwargs() {
        let dir = tempfile::tempdir().unwrap();
        let results: Arc<dyn Results> = Arc::new(LocalFileResults::new(vec![dir.path().to_path_buf()]));
        let scratch: Arc<dyn Scratch> = Arc::new(DefaultScratch::new(vec![dir.path().to_path_buf()]).unwrap());
        let mut kwargs = Map::new();
        kwargs.insert("region".into(), Value::String("eu".into()));
        let ctx = ServiceContext::new(
            "svc",
            dir.path().to_path_buf(),
            request_with(kwargs),
            results,
            scratch,
            no_invoker(),
        );

        let mut outgoing = Map::new();
        ctx.pre_execute_hook(&mut outgoing);
        assert_eq!(outgoing["region"], Value::String("eu".into()));
        assert!(outgoing.contains_key("tracker"));
    }

    #[tokio::test]
    async fn invoke_forwards_kwargs_and_merges_child_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let results: Arc<dyn Results> = Arc::new(LocalFileResults::new(vec![dir.path().to_path_buf()]));
        let scratch: Arc<dyn Scratch> = Arc::new(DefaultScratch::new(vec![dir.path().to_path_buf()]).unwrap());
        let mut kwargs = Map::new();
        kwargs.insert("region".into(), Value::String("eu".into()));
        let invoker = Arc::new(StubInvoker::new());
        let ctx = ServiceContext::new(
            "proxy",
            dir.path().to_path_buf(),
            request_with(kwargs),
            results,
            scratch,
            invoker.clone(),
        );

        let result = ctx.invoke("echo", vec![Value::String("foo".into())], Map::new()).await.unwrap();
        assert_eq!(result, Value::from(1));

        let calls = invoker.calls.lock().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "echo");
        assert_eq!(calls[0].2["region"], Value::String("eu".into()));

        let value = ctx.metadata().as_value();
        let kids = value["kids"].as_array().unwrap();
        assert_eq!(kids.len(), 1);
        assert_eq!(kids[0]["task"], Value::String("echo".into()));
    }
}
