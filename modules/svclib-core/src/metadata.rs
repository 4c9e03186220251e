//! Per-call metadata tree: timers, free-form notes, and nested child-call
//! metadata, propagated across process boundaries via `x-servicelib-*`
//! HTTP headers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use sysinfo::System;

use crate::timer::{Timer, TimerGuard};

const HEADER_PREFIX: &str = "x-servicelib-";
const TOLERANCE_SECS: f64 = 0.01;

struct Inner {
    task: Option<String>,
    host: String,
    pid: u32,
    start: f64,
    stop: f64,
    timers: HashMap<String, Timer>,
    notes: Map<String, Value>,
    kids: Vec<Metadata>,
}

/// Shared, cheaply-cloneable handle onto a call's metadata tree. Clones
/// refer to the same underlying state, so a context's metadata can be
/// captured by a timer guard or a spawned subtask and still observe
/// updates made elsewhere.
#[derive(Clone)]
pub struct Metadata(Arc<Mutex<Inner>>);

fn local_hostname() -> String {
    System::host_name().unwrap_or_else(|| "localhost".to_string())
}

impl Metadata {
    pub fn new(task: impl Into<String>) -> Self {
        Self(Arc::new(Mutex::new(Inner {
            task: Some(task.into()),
            host: local_hostname(),
            pid: std::process::id(),
            start: 0.0,
            stop: 0.0,
            timers: HashMap::new(),
            notes: Map::new(),
            kids: Vec::new(),
        })))
    }

    pub fn unnamed() -> Self {
        Self(Arc::new(Mutex::new(Inner {
            task: None,
            host: local_hostname(),
            pid: std::process::id(),
            start: 0.0,
            stop: 0.0,
            timers: HashMap::new(),
            notes: Map::new(),
            kids: Vec::new(),
        })))
    }

    pub fn task(&self) -> Option<String> {
        self.0.lock().unwrap().task.clone()
    }

    /// Marks the top-level span as starting now.
    pub fn start(&self) {
        let mut inner = self.0.lock().unwrap();
        inner.start = crate::timer::now_secs();
    }

    /// Marks the top-level span as finished now.
    pub fn stop(&self) {
        let mut inner = self.0.lock().unwrap();
        inner.stop = crate::timer::now_secs();
    }

    /// Attaches a value to the call's notes. Only JSON scalars, arrays,
    /// and objects are accepted; `null` is rejected.
    pub fn annotate(&self, key: impl Into<String>, value: Value) {
        if matches!(value, Value::Null) {
            return;
        }
        self.0.lock().unwrap().notes.insert(key.into(), value);
    }

    pub fn notes(&self) -> Map<String, Value> {
        self.0.lock().unwrap().notes.clone()
    }

    /// Returns a guard that starts the named timer now and stops it when
    /// dropped, accumulating onto any previous time recorded under `name`.
    pub fn timer(&self, name: impl Into<String>) -> TimerGuardHandle {
        let name = name.into();
        {
            let mut inner = self.0.lock().unwrap();
            inner.timers.entry(name.clone()).or_default().start();
        }
        TimerGuardHandle {
            metadata: self.clone(),
            name,
        }
    }

    pub fn elapsed(&self, name: &str) -> Option<f64> {
        self.0.lock().unwrap().timers.get(name).map(Timer::elapsed)
    }

    /// Pauses a named timer without dropping its guard, so the caller can
    /// exclude some inner span (e.g. the actual call behind a cache miss)
    /// from what the timer measures.
    pub fn pause_timer(&self, name: &str) {
        if let Some(timer) = self.0.lock().unwrap().timers.get_mut(name) {
            timer.stop();
        }
    }

    /// Resumes a named timer previously paused with [`Metadata::pause_timer`].
    pub fn resume_timer(&self, name: &str) {
        if let Some(timer) = self.0.lock().unwrap().timers.get_mut(name) {
            timer.start();
        }
    }

    pub fn clear_timers(&self) {
        self.0.lock().unwrap().timers.clear();
    }

    /// Merges externally-computed timer values (e.g. from a subprocess
    /// that tracked its own timing) into this metadata's timer set.
    pub fn update_timers(&self, extra: &Map<String, Value>) {
        let mut inner = self.0.lock().unwrap();
        for (k, v) in extra {
            inner.timers.insert(k.clone(), Timer::from_value(v));
        }
    }

    /// Appends `other` as a child of this metadata's call tree, unless it
    /// is already equal to this node (value equality, 10ms timestamp
    /// tolerance) — mirrors the dedup behaviour of repeated updates from
    /// the same nested call.
    pub fn update_metadata(&self, other: &Metadata) {
        if self == other {
            return;
        }
        self.0.lock().unwrap().kids.push(other.clone());
    }

    /// First tracker recorded in this node's notes, falling back to the
    /// first child that has one.
    pub fn tracker(&self) -> Option<String> {
        if let Some(Value::String(t)) = self.0.lock().unwrap().notes.get("tracker") {
            return Some(t.clone());
        }
        self.0
            .lock()
            .unwrap()
            .kids
            .iter()
            .find_map(Metadata::tracker)
    }

    pub fn as_value(&self) -> Value {
        let inner = self.0.lock().unwrap();
        let timers: Map<String, Value> = inner
            .timers
            .iter()
            .map(|(k, v)| (k.clone(), v.as_value()))
            .collect();
        let kids: Vec<Value> = inner.kids.iter().map(Metadata::as_value).collect();
        let mut out = Map::new();
        out.insert(
            "task".into(),
            inner
                .task
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
        );
        out.insert("host".into(), Value::String(inner.host.clone()));
        out.insert("pid".into(), Value::from(inner.pid));
        out.insert("start".into(), Value::from(inner.start));
        out.insert("stop".into(), Value::from(inner.stop));
        out.insert("timers".into(), Value::Object(timers));
        out.insert("kids".into(), Value::Array(kids));
        out.insert("notes".into(), Value::Object(inner.notes.clone()));
        for (k, v) in &inner.notes {
            out.insert(k.clone(), v.clone());
        }
        Value::Object(out)
    }

    pub fn from_value(value: &Value) -> Self {
        let task = value
            .get("task")
            .and_then(Value::as_str)
            .map(str::to_string);
        let host = value
            .get("host")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let pid = value.get("pid").and_then(Value::as_u64).unwrap_or(0) as u32;
        let start = value.get("start").and_then(Value::as_f64).unwrap_or(0.0);
        let stop = value.get("stop").and_then(Value::as_f64).unwrap_or(0.0);
        let timers = value
            .get("timers")
            .and_then(Value::as_object)
            .map(|m| {
                m.iter()
                    .map(|(k, v)| (k.clone(), Timer::from_value(v)))
                    .collect()
            })
            .unwrap_or_default();
        let kids = value
            .get("kids")
            .and_then(Value::as_array)
            .map(|a| a.iter().map(Metadata::from_value).collect())
            .unwrap_or_default();
        let notes = value
            .get("notes")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Self(Arc::new(Mutex::new(Inner {
            task,
            host,
            pid,
            start,
            stop,
            timers,
            notes,
            kids,
        })))
    }

    /// Flattens this metadata into `x-servicelib-*` HTTP headers. Nested
    /// children are embedded as plain JSON (via [`Metadata::as_value`]),
    /// not recursively flattened into further headers.
    pub fn as_http_headers(&self) -> HashMap<String, String> {
        let inner = self.0.lock().unwrap();
        let mut headers = HashMap::new();
        headers.insert(
            format!("{HEADER_PREFIX}task"),
            inner.task.clone().unwrap_or_default(),
        );
        headers.insert(format!("{HEADER_PREFIX}host"), inner.host.clone());
        headers.insert(format!("{HEADER_PREFIX}pid"), inner.pid.to_string());
        headers.insert(format!("{HEADER_PREFIX}start"), inner.start.to_string());
        headers.insert(format!("{HEADER_PREFIX}stop"), inner.stop.to_string());
        let timers: Map<String, Value> = inner
            .timers
            .iter()
            .map(|(k, v)| (k.clone(), v.as_value()))
            .collect();
        headers.insert(
            format!("{HEADER_PREFIX}timers"),
            Value::Object(timers).to_string(),
        );
        let kids: Vec<Value> = inner.kids.iter().map(Metadata::as_value).collect();
        headers.insert(format!("{HEADER_PREFIX}kids"), Value::Array(kids).to_string());
        for (k, v) in &inner.notes {
            headers.insert(format!("{HEADER_PREFIX}note-{k}"), v.to_string());
        }
        headers
    }

    /// Reconstructs metadata from a header map (case-insensitive lookup
    /// expected of the caller — keys here are already lowercase).
    pub fn from_http_headers(headers: &HashMap<String, String>) -> Self {
        let task = headers.get(&format!("{HEADER_PREFIX}task")).cloned();
        let host = headers
            .get(&format!("{HEADER_PREFIX}host"))
            .cloned()
            .unwrap_or_default();
        let pid = headers
            .get(&format!("{HEADER_PREFIX}pid"))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let start = headers
            .get(&format!("{HEADER_PREFIX}start"))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);
        let stop = headers
            .get(&format!("{HEADER_PREFIX}stop"))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);
        let timers = headers
            .get(&format!("{HEADER_PREFIX}timers"))
            .and_then(|s| serde_json::from_str::<Value>(s).ok())
            .and_then(|v| v.as_object().cloned())
            .map(|m| {
                m.iter()
                    .map(|(k, v)| (k.clone(), Timer::from_value(v)))
                    .collect()
            })
            .unwrap_or_default();
        let kids = headers
            .get(&format!("{HEADER_PREFIX}kids"))
            .and_then(|s| serde_json::from_str::<Value>(s).ok())
            .and_then(|v| v.as_array().cloned())
            .map(|a| a.iter().map(Metadata::from_value).collect())
            .unwrap_or_default();
        let mut notes = Map::new();
        let note_prefix = format!("{HEADER_PREFIX}note-");
        for (k, v) in headers {
            if let Some(name) = k.strip_prefix(&note_prefix) {
                if let Ok(value) = serde_json::from_str::<Value>(v) {
                    notes.insert(name.to_string(), value);
                }
            }
        }
        Self(Arc::new(Mutex::new(Inner {
            task,
            host,
            pid,
            start,
            stop,
            timers,
            notes,
            kids,
        })))
    }
}

impl PartialEq for Metadata {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        let a = self.0.lock().unwrap();
        let b = other.0.lock().unwrap();
        a.task == b.task
            && a.host == b.host
            && a.pid == b.pid
            && (a.start - b.start).abs() < TOLERANCE_SECS
            && (a.stop - b.stop).abs() < TOLERANCE_SECS
            && a.timers == b.timers
            && a.notes == b.notes
            && a.kids == b.kids
    }
}

/// RAII handle returned by [`Metadata::timer`]. Stops the named timer on
/// drop.
pub struct TimerGuardHandle {
    metadata: Metadata,
    name: String,
}

impl Drop for TimerGuardHandle {
    fn drop(&mut self) {
        let mut inner = self.metadata.0.lock().unwrap();
        if let Some(timer) = inner.timers.get_mut(&self.name) {
            let guard = TimerGuard { timer };
            drop(guard);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotate_rejects_null() {
        let m = Metadata::new("task");
        m.annotate("x", Value::Null);
        assert!(m.notes().get("x").is_none());
    }

    #[test]
    fn round_trips_through_headers() {
        let m = Metadata::new("task");
        m.start();
        {
            let _t = m.timer("work");
        }
        m.annotate("tracker", Value::String("tracker-abc".into()));
        m.stop();
        let headers = m.as_http_headers();
        let back = Metadata::from_http_headers(&headers);
        assert_eq!(m, back);
    }

    #[test]
    fn update_metadata_appends_distinct_kids() {
        let parent = Metadata::new("parent");
        let child = Metadata::new("child");
        child.start();
        child.stop();
        parent.update_metadata(&child);
        assert_eq!(parent.as_value()["kids"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn update_metadata_skips_equal_node() {
        let parent = Metadata::new("same");
        let other = Metadata::new("same");
        parent.update_metadata(&other);
        assert_eq!(parent.as_value()["kids"].as_array().unwrap().len(), 0);
    }
}
