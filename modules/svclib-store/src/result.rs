//! A single result artifact: an opened file on disk that, once closed,
//! is addressable by a `location` URL (a `file://` or `http://` URL
//! depending on the backend that created it).

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::errors::StoreError;

const RESERVED_KEYS: [&str; 4] = ["location", "contentType", "contentLength", "metadata"];

#[derive(Debug, Clone)]
pub enum Location {
    Local,
    Http { netloc: String },
}

/// A result being (or having been) written to local disk, addressable
/// either as a `file://` URI or, when fronted by a static file server, an
/// `http://` URL at the same path.
pub struct FileResult {
    path: PathBuf,
    content_type: String,
    location: Location,
    file: Option<File>,
    is_open: bool,
    length: u64,
    path_accessed: bool,
    metadata: Map<String, Value>,
}

impl FileResult {
    pub fn new(path: PathBuf, content_type: impl Into<String>, location: Location) -> Self {
        Self {
            path,
            content_type: content_type.into(),
            location,
            file: None,
            is_open: false,
            length: 0,
            path_accessed: false,
            metadata: Map::new(),
        }
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn path(&mut self) -> &Path {
        self.path_accessed = true;
        &self.path
    }

    pub fn location(&self) -> String {
        match &self.location {
            Location::Local => format!("file://{}", self.path.display()),
            Location::Http { netloc } => format!("http://{netloc}{}", self.path.display()),
        }
    }

    /// Current known length. Once the underlying path has been accessed
    /// directly (e.g. by a process runner writing to it out-of-band),
    /// falls back to the file's actual size on disk instead of the
    /// tracked write count.
    pub async fn length(&self) -> u64 {
        if self.path_accessed {
            tokio::fs::metadata(&self.path)
                .await
                .map(|m| m.len())
                .unwrap_or(self.length)
        } else {
            self.length
        }
    }

    /// Attaches a `(key, value)` pair that will appear in [`FileResult::as_value`].
    pub fn annotate(&mut self, key: impl Into<String>, value: Value) -> Result<(), StoreError> {
        let key = key.into();
        if RESERVED_KEYS.contains(&key.as_str()) {
            return Err(StoreError::Config(format!("invalid result annotation key '{key}'")));
        }
        self.metadata.insert(key, value);
        Ok(())
    }

    pub async fn open(&mut self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.file = Some(File::create(&self.path).await?);
        self.is_open = true;
        Ok(())
    }

    pub async fn write(&mut self, data: &[u8]) -> Result<usize, StoreError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| StoreError::NotOpen(self.location()))?;
        file.write_all(data).await?;
        self.length += data.len() as u64;
        Ok(data.len())
    }

    pub async fn close(&mut self) -> Result<(), StoreError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
        }
        self.is_open = false;
        Ok(())
    }

    pub async fn as_value(&self) -> Result<Value, StoreError> {
        if self.is_open {
            return Err(StoreError::StillOpen(self.location()));
        }
        let mut map = Map::new();
        map.insert("location".into(), Value::String(self.location()));
        map.insert("contentLength".into(), Value::from(self.length().await));
        map.insert("contentType".into(), Value::String(self.content_type.clone()));
        for (k, v) in &self.metadata {
            map.insert(k.clone(), v.clone());
        }
        Ok(Value::Object(map))
    }
}
