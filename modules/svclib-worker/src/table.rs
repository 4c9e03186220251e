//! The set of services a worker process answers for, registered
//! explicitly at startup instead of discovered by scanning a directory of
//! modules.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use svclib_context::Service;

#[derive(Clone)]
pub struct ServiceEntry {
    pub home: PathBuf,
    pub service: Arc<dyn Service>,
}

#[derive(Clone, Default)]
pub struct ServiceTable(HashMap<String, ServiceEntry>);

impl ServiceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, home: PathBuf, service: Arc<dyn Service>) -> &mut Self {
        self.0.insert(name.into(), ServiceEntry { home, service });
        self
    }

    pub fn get(&self, name: &str) -> Option<&ServiceEntry> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
