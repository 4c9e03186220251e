//! Configuration layer: process-level [`AppConfig`] read from the
//! environment, and [`ConfigClient`], a hierarchical, polling client for
//! business settings served from a file or an HTTP settings source.

pub mod app;
pub mod backend;
pub mod client;
pub mod errors;
pub mod tree;

pub use app::AppConfig;
pub use backend::{backend_for_url, ConfigBackend, FileBackend, HttpBackend};
pub use client::ConfigClient;
pub use errors::ConfigError;
pub use tree::ConfigTree;
