//! Factories that create new [`FileResult`]s and resolve an already
//! serialized result back to a local path when possible.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use sysinfo::System;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::extension::extension_for;
use crate::result::{FileResult, Location};

#[async_trait]
pub trait Results: Send + Sync {
    async fn create(&self, content_type: &str) -> Result<FileResult, StoreError>;

    /// Resolves a previously serialized result back to a path on local
    /// disk, when it lives under one of this backend's result
    /// directories and its size still matches what was recorded.
    async fn as_local_file(&self, result: &Value) -> Option<PathBuf>;
}

fn random_fanout_dir(base: &Path) -> PathBuf {
    let mut rng = rand::thread_rng();
    base.join(format!("{:02x}", rng.gen::<u8>()))
        .join(format!("{:02x}", rng.gen::<u8>()))
}

async fn result_filename(result_dirs: &[PathBuf], content_type: &str) -> Result<PathBuf, StoreError> {
    let base = &result_dirs[rand::thread_rng().gen_range(0..result_dirs.len())];
    let dir = random_fanout_dir(base);
    tokio::fs::create_dir_all(&dir).await?;
    let name = format!("{}-{}{}", Uuid::new_v4().simple(), "result", extension_for(content_type));
    Ok(dir.join(name))
}

fn path_from_file_url(location: &str) -> Option<PathBuf> {
    location.strip_prefix("file://").map(PathBuf::from)
}

async fn resolve_local(result_dirs: &[PathBuf], result: &Value) -> Option<PathBuf> {
    let location = result.get("location")?.as_str()?;
    let expected_len = result.get("contentLength")?.as_u64()?;
    let path = path_from_file_url(location)?;
    for dir in result_dirs {
        if path.starts_with(dir) {
            if let Ok(meta) = tokio::fs::metadata(&path).await {
                if meta.len() == expected_len {
                    return Some(path);
                }
                tracing::debug!(?path, actual = meta.len(), expected_len, "size mismatch for local result");
            }
        }
    }
    None
}

/// Writes results straight to local disk, addressed by `file://` URLs.
/// Suitable for a single-machine deployment or when the client has shared
/// filesystem access to the worker's result directories.
pub struct LocalFileResults {
    result_dirs: Vec<PathBuf>,
}

impl LocalFileResults {
    pub fn new(result_dirs: Vec<PathBuf>) -> Self {
        Self { result_dirs }
    }
}

#[async_trait]
impl Results for LocalFileResults {
    async fn create(&self, content_type: &str) -> Result<FileResult, StoreError> {
        let path = result_filename(&self.result_dirs, content_type).await?;
        Ok(FileResult::new(path, content_type, Location::Local))
    }

    async fn as_local_file(&self, result: &Value) -> Option<PathBuf> {
        resolve_local(&self.result_dirs, result).await
    }
}

/// Writes results to local disk but addresses them with `http://` URLs
/// pointing at a static file server fronting the same result directories
/// (see `svclib-worker`'s `ServeDir` mount).
pub struct HttpFileResults {
    result_dirs: Vec<PathBuf>,
    netloc: String,
}

impl HttpFileResults {
    pub fn new(result_dirs: Vec<PathBuf>, host: Option<String>, port: u16) -> Self {
        let host = host.unwrap_or_else(|| System::host_name().unwrap_or_else(|| "localhost".into()));
        Self {
            result_dirs,
            netloc: format!("{host}:{port}"),
        }
    }
}

#[async_trait]
impl Results for HttpFileResults {
    async fn create(&self, content_type: &str) -> Result<FileResult, StoreError> {
        let path = result_filename(&self.result_dirs, content_type).await?;
        Ok(FileResult::new(
            path,
            content_type,
            Location::Http {
                netloc: self.netloc.clone(),
            },
        ))
    }

    async fn as_local_file(&self, result: &Value) -> Option<PathBuf> {
        // HTTP-addressed results still live on local disk; resolve them
        // the same way, but via the `http://<netloc>/<path>` shape.
        let location = result.get("location")?.as_str()?;
        let expected_len = result.get("contentLength")?.as_u64()?;
        let path = location
            .strip_prefix("http://")
            .and_then(|rest| rest.split_once('/'))
            .map(|(_, path)| PathBuf::from(format!("/{path}")))?;
        for dir in &self.result_dirs {
            if path.starts_with(dir) {
                if let Ok(meta) = tokio::fs::metadata(&path).await {
                    if meta.len() == expected_len {
                        return Some(path);
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_result_under_configured_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileResults::new(vec![dir.path().to_path_buf()]);
        let mut result = store.create("text/plain").await.unwrap();
        result.open().await.unwrap();
        result.write(b"hello").await.unwrap();
        result.close().await.unwrap();
        let value = result.as_value().await.unwrap();
        assert_eq!(value["contentLength"], 5);
        assert!(value["location"].as_str().unwrap().starts_with("file://"));
    }

    #[tokio::test]
    async fn as_local_file_validates_size() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileResults::new(vec![dir.path().to_path_buf()]);
        let mut result = store.create("text/plain").await.unwrap();
        result.open().await.unwrap();
        result.write(b"hello").await.unwrap();
        result.close().await.unwrap();
        let value = result.as_value().await.unwrap();

        let resolved = store.as_local_file(&value).await;
        assert!(resolved.is_some());
    }
}
