//! Hierarchical, polling config client. Values are looked up by dotted
//! key, with group/name scoping and environment-variable overrides taking
//! precedence over whatever the backend has on file.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::warn;

use crate::backend::ConfigBackend;
use crate::errors::ConfigError;
use crate::tree::ConfigTree;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

struct State {
    tree: Option<ConfigTree>,
    last_good: Option<ConfigTree>,
}

/// A cached, auto-refreshing view over a config backend, scoped to an
/// optional `(group, name)` pair used to build lookup prefixes.
pub struct ConfigClient {
    backend: Arc<dyn ConfigBackend>,
    group: Option<String>,
    name: Option<String>,
    poll_interval: Duration,
    state: Arc<RwLock<State>>,
    poller_started: Arc<AtomicBool>,
}

fn env_var_name(key: &str) -> String {
    format!("SERVICELIB_{}", key.replace('.', "_").to_uppercase())
}

/// Coerces a raw environment-variable string the way the config source
/// would encode a typed value: `true`/`false` as booleans, a leading
/// `{`/`[` as JSON, otherwise int, then float, else the string itself.
fn coerce_env_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    match trimmed.to_lowercase().as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(v) = serde_json::from_str(trimmed) {
            return v;
        }
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return Value::from(f);
    }
    Value::String(raw.to_string())
}

impl ConfigClient {
    pub fn new(backend: Arc<dyn ConfigBackend>) -> Self {
        Self {
            backend,
            group: None,
            name: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            state: Arc::new(RwLock::new(State {
                tree: None,
                last_good: None,
            })),
            poller_started: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn scoped(mut self, group: Option<String>, name: Option<String>) -> Self {
        self.group = group;
        self.name = name;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn candidate_keys(&self, key: &str, exact: bool, group: Option<&str>, name: Option<&str>) -> Vec<String> {
        if exact || group.is_none() {
            return vec![key.to_string()];
        }
        let group = group.unwrap();
        match name {
            Some(name) => vec![
                format!("{group}.{name}.{key}"),
                format!("{group}.{key}"),
                key.to_string(),
            ],
            None => vec![format!("{group}.{key}"), key.to_string()],
        }
    }

    /// Spawns the background poller the first time it's needed, and
    /// guarantees the backend has been fetched at least once before
    /// returning (mirroring the original's "run once synchronously, then
    /// poll in the background" contract).
    async fn ensure_poller(&self) {
        if self.poller_started.swap(true, Ordering::SeqCst) {
            return;
        }
        self.refresh().await;
        let state = self.state.clone();
        let backend = self.backend.clone();
        let interval = self.poll_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                refresh_state(&backend, &state).await;
            }
        });
    }

    async fn refresh(&self) {
        refresh_state(&self.backend, &self.state).await;
    }

    pub async fn lookup(
        &self,
        key: &str,
        default: Option<Value>,
        exact: bool,
        group: Option<&str>,
        name: Option<&str>,
    ) -> Result<Value, ConfigError> {
        self.ensure_poller().await;
        for k in self.candidate_keys(key, exact, group, name) {
            if let Ok(raw) = std::env::var(env_var_name(&k)) {
                return Ok(coerce_env_value(&raw));
            }
            let found = self.state.read().await.tree.as_ref().and_then(|t| t.get(&k));
            if let Some(value) = found {
                return Ok(value);
            }
        }
        default.ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))
    }

    pub async fn get(&self, key: &str, default: Option<Value>) -> Result<Value, ConfigError> {
        self.lookup(key, default, false, self.group.as_deref(), self.name.as_deref())
            .await
    }

    pub async fn set(&self, key: &str, value: Value) -> Result<(), ConfigError> {
        if key.is_empty() {
            return Err(ConfigError::InvalidKey(key.to_string()));
        }
        self.backend.set_key(key, &value).await?;
        self.state.write().await.tree = None;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<(), ConfigError> {
        self.backend.delete_key(key).await?;
        self.state.write().await.tree = None;
        Ok(())
    }

    pub async fn dump(&self) -> Result<Value, ConfigError> {
        self.ensure_poller().await;
        Ok(self
            .state
            .read()
            .await
            .tree
            .as_ref()
            .map(ConfigTree::as_value)
            .unwrap_or_default())
    }
}

async fn refresh_state(backend: &Arc<dyn ConfigBackend>, state: &Arc<RwLock<State>>) {
    match backend.read_values().await {
        Ok(values) => {
            let tree = ConfigTree::new(values);
            let mut guard = state.write().await;
            guard.last_good = Some(tree.clone());
            guard.tree = Some(tree);
        }
        Err(e) => {
            let mut guard = state.write().await;
            if let Some(last_good) = guard.last_good.clone() {
                warn!(error = %e, backend = backend.describe(), "config fetch failed, reusing previous values");
                guard.tree = Some(last_good);
            } else {
                warn!(error = %e, backend = backend.describe(), "config fetch failed, no previous values to fall back to");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_bool_int_float_json() {
        assert_eq!(coerce_env_value("true"), Value::Bool(true));
        assert_eq!(coerce_env_value("FALSE"), Value::Bool(false));
        assert_eq!(coerce_env_value("42"), Value::from(42));
        assert_eq!(coerce_env_value("3.14"), Value::from(3.14));
        assert_eq!(coerce_env_value("[1,2]"), serde_json::json!([1, 2]));
        assert_eq!(coerce_env_value("hello"), Value::String("hello".into()));
    }

    #[test]
    fn candidate_keys_follow_group_name_precedence() {
        let client = ConfigClient::new(Arc::new(NoopBackendForTest));
        let keys = client.candidate_keys("foo", false, Some("g"), Some("n"));
        assert_eq!(keys, vec!["g.n.foo", "g.foo", "foo"]);
    }

    struct NoopBackendForTest;

    #[async_trait::async_trait]
    impl ConfigBackend for NoopBackendForTest {
        async fn read_values(&self) -> Result<Value, ConfigError> {
            Ok(serde_json::json!({}))
        }
        async fn set_key(&self, _key: &str, _value: &Value) -> Result<(), ConfigError> {
            Ok(())
        }
        async fn delete_key(&self, _key: &str) -> Result<(), ConfigError> {
            Ok(())
        }
        fn describe(&self) -> String {
            "noop".to_string()
        }
    }
}
