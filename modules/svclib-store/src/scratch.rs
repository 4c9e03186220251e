//! Content-addressed download cache: a `result`'s `location` URL is
//! hashed to a local path, and the remote content is fetched into that
//! path on first use, so repeated accesses never re-download.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::errors::StoreError;

const XFER_BLOCK_SIZE: usize = 128 * 1024;
const DOWNLOAD_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

#[async_trait]
pub trait Scratch: Send + Sync {
    async fn create_temp_file(&self) -> Result<PathBuf, StoreError>;
    async fn as_local_file(&self, result: &Value) -> Result<PathBuf, StoreError>;
}

fn fanout_path(base: &Path, digest: &str) -> PathBuf {
    base.join(&digest[0..2]).join(&digest[2..4]).join(digest)
}

/// Downloads remote results into one of a set of scratch directories,
/// picked at random for each new temp file or download.
pub struct DefaultScratch {
    dirs: Vec<PathBuf>,
    http: reqwest::Client,
}

impl DefaultScratch {
    pub fn new(dirs: Vec<PathBuf>) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .connect_timeout(DOWNLOAD_CONNECT_TIMEOUT)
            .build()
            .map_err(StoreError::Http)?;
        Ok(Self { dirs, http })
    }

    fn random_dir(&self) -> &Path {
        let idx = rand::thread_rng().gen_range(0..self.dirs.len());
        &self.dirs[idx]
    }

    async fn download_into(&self, url: &str, dest: &Path) -> Result<(), StoreError> {
        let parsed = url::Url::parse(url)
            .map_err(|_| StoreError::UnsupportedScheme("<unparseable>".into(), url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(StoreError::UnsupportedScheme(
                parsed.scheme().to_string(),
                url.to_string(),
            ));
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = dest.with_extension("part");
        let result = async {
            let mut resp = self.http.get(url).send().await?.error_for_status()?;
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            while let Some(chunk) = resp.chunk().await? {
                for block in chunk.chunks(XFER_BLOCK_SIZE) {
                    file.write_all(block).await?;
                }
            }
            file.flush().await?;
            Ok::<(), StoreError>(())
        }
        .await;

        match result {
            Ok(()) => {
                tokio::fs::rename(&tmp_path, dest).await?;
                Ok(())
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Scratch for DefaultScratch {
    async fn create_temp_file(&self) -> Result<PathBuf, StoreError> {
        let dir = self
            .random_dir()
            .join(format!("{:02x}", rand::thread_rng().gen::<u8>()))
            .join(format!("{:02x}", rand::thread_rng().gen::<u8>()));
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}-scratch", uuid::Uuid::new_v4().simple()));
        tokio::fs::File::create(&path).await?;
        Ok(path)
    }

    async fn as_local_file(&self, result: &Value) -> Result<PathBuf, StoreError> {
        let location = result
            .get("location")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Config("result has no 'location' field".into()))?;

        let digest = hex::encode(Sha256::digest(location.as_bytes()));

        for dir in &self.dirs {
            let candidate = fanout_path(dir, &digest);
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                tracing::debug!(path = %candidate.display(), "already downloaded, reusing");
                return Ok(candidate);
            }
        }

        let dest = fanout_path(self.random_dir(), &digest);
        tracing::debug!(url = location, path = %dest.display(), "downloading");
        self.download_into(location, &dest).await?;
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_temp_file_lands_under_a_scratch_dir() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = DefaultScratch::new(vec![dir.path().to_path_buf()]).unwrap();
        let path = scratch.create_temp_file().await.unwrap();
        assert!(path.starts_with(dir.path()));
        assert!(tokio::fs::try_exists(&path).await.unwrap());
    }

    #[tokio::test]
    async fn as_local_file_rejects_missing_location() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = DefaultScratch::new(vec![dir.path().to_path_buf()]).unwrap();
        let err = scratch.as_local_file(&serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }
}
