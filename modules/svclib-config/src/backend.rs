//! Sources a [`crate::tree::ConfigTree`] can be loaded from or written back
//! to: a read-only YAML file, or an HTTP settings service.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::ConfigError;

#[async_trait]
pub trait ConfigBackend: Send + Sync {
    async fn read_values(&self) -> Result<Value, ConfigError>;
    async fn set_key(&self, key: &str, value: &Value) -> Result<(), ConfigError>;
    async fn delete_key(&self, key: &str) -> Result<(), ConfigError>;
    fn describe(&self) -> String;
}

pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ConfigBackend for FileBackend {
    async fn read_values(&self) -> Result<Value, ConfigError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ConfigError::Source(format!("reading {}: {e}", self.path.display())))?;
        serde_yaml::from_str(&text)
            .map_err(|e| ConfigError::Source(format!("parsing {}: {e}", self.path.display())))
    }

    async fn set_key(&self, _key: &str, _value: &Value) -> Result<(), ConfigError> {
        Err(ConfigError::ReadOnly)
    }

    async fn delete_key(&self, _key: &str) -> Result<(), ConfigError> {
        Err(ConfigError::ReadOnly)
    }

    fn describe(&self) -> String {
        format!("file://{}", self.path.display())
    }
}

pub struct HttpBackend {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn key_url(&self, key: &str) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().expect("base url cannot be a base");
            for bit in key.split('.').filter(|s| !s.is_empty()) {
                segments.push(bit);
            }
        }
        url
    }
}

#[async_trait]
impl ConfigBackend for HttpBackend {
    async fn read_values(&self) -> Result<Value, ConfigError> {
        let resp = self
            .client
            .get(self.base_url.clone())
            .send()
            .await
            .map_err(|e| ConfigError::Source(e.to_string()))?
            .error_for_status()
            .map_err(|e| ConfigError::Source(e.to_string()))?;
        let body = resp
            .bytes()
            .await
            .map_err(|e| ConfigError::Source(e.to_string()))?;
        serde_yaml::from_slice(&body).map_err(|e| ConfigError::Source(e.to_string()))
    }

    async fn set_key(&self, key: &str, value: &Value) -> Result<(), ConfigError> {
        let resp = self
            .client
            .post(self.key_url(key))
            .json(value)
            .send()
            .await
            .map_err(|e| ConfigError::Source(e.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ConfigError::Source(format!(
                "POST {} failed: {}",
                key,
                resp.status()
            )))
        }
    }

    async fn delete_key(&self, key: &str) -> Result<(), ConfigError> {
        let resp = self
            .client
            .delete(self.key_url(key))
            .send()
            .await
            .map_err(|e| ConfigError::Source(e.to_string()))?;
        match resp.status().as_u16() {
            200..=299 => Ok(()),
            404 => Err(ConfigError::KeyNotFound(key.to_string())),
            status => Err(ConfigError::Source(format!("DELETE {key} failed: {status}"))),
        }
    }

    fn describe(&self) -> String {
        self.base_url.to_string()
    }
}

/// Builds the right backend for a `SERVICELIB_CONFIG_URL`-style URL:
/// `file://` for a local YAML file, `http(s)://` for a settings service.
pub fn backend_for_url(url: &Url) -> Result<Box<dyn ConfigBackend>, ConfigError> {
    match url.scheme() {
        "http" | "https" => Ok(Box::new(HttpBackend::new(url.clone()))),
        "file" => Ok(Box::new(FileBackend::new(PathBuf::from(url.path())))),
        other => Err(ConfigError::UnsupportedScheme(other.to_string())),
    }
}
