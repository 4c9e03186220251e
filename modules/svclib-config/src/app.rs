//! Process-level settings read once at startup, in the style of the
//! teacher's `Config::from_env` constructors: required variables panic
//! with a clear message, optional ones fall back to sane defaults, and
//! nothing secret is ever logged in full.

use std::env;

use tracing::info;

/// Settings shared by the `worker` and `client` binaries.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub redis_url: String,
    pub log_level: String,
    pub log_type: LogType,
    pub bind_addr: String,
    pub num_worker_threads: usize,
    pub config_url: String,
    pub config_poll_interval_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogType {
    Text,
    Json,
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("required environment variable `{key}` is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let log_type = match optional_env("SERVICELIB_LOG_TYPE", "text").as_str() {
            "json" => LogType::Json,
            _ => LogType::Text,
        };
        Self {
            redis_url: optional_env("SERVICELIB_REDIS_URL", "redis://127.0.0.1:6379"),
            log_level: optional_env("SERVICELIB_LOG_LEVEL", "info"),
            log_type,
            bind_addr: optional_env("SERVICELIB_BIND_ADDR", "0.0.0.0:8888"),
            num_worker_threads: optional_env("SERVICELIB_NUM_THREADS", "1")
                .parse()
                .unwrap_or(1),
            config_url: optional_env("SERVICELIB_CONFIG_URL", "http://localhost:9999/settings/"),
            config_poll_interval_secs: optional_env("SERVICELIB_CONFIG_POLL_INTERVAL", "10")
                .parse()
                .unwrap_or(10),
        }
    }

    /// Builds a config requiring a Redis URL to be set explicitly, used by
    /// binaries that must not silently fall back to a local default.
    pub fn worker_from_env() -> Self {
        let mut cfg = Self::from_env();
        cfg.redis_url = required_env("SERVICELIB_REDIS_URL");
        cfg
    }

    /// Logs the resolved settings without leaking connection credentials
    /// embedded in URLs.
    pub fn log_redacted(&self) {
        info!(
            redis_url = %redact_url(&self.redis_url),
            log_level = %self.log_level,
            bind_addr = %self.bind_addr,
            num_worker_threads = self.num_worker_threads,
            config_url = %redact_url(&self.config_url),
            "resolved configuration"
        );
    }
}

fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut url) if !url.username().is_empty() || url.password().is_some() => {
            let _ = url.set_username("redacted");
            let _ = url.set_password(None);
            url.to_string()
        }
        Ok(url) => url.to_string(),
        Err(_) => raw.to_string(),
    }
}
