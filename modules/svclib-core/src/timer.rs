//! Wall-clock accumulator used by [`crate::metadata::Metadata`] to time
//! named spans of work (a cache lookup, a subprocess run, a nested call).

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub(crate) fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs_f64()
}

/// A single named timer. Can be started and stopped repeatedly; `elapsed`
/// accumulates across all start/stop pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timer {
    elapsed: f64,
    start: Option<f64>,
}

impl Default for Timer {
    fn default() -> Self {
        Self {
            elapsed: 0.0,
            start: None,
        }
    }
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or resumes) the timer. No-op if already running.
    pub fn start(&mut self) {
        if self.start.is_none() {
            self.start = Some(now_secs());
        }
    }

    /// Stops the timer, folding the elapsed span into the running total.
    /// No-op if not running.
    pub fn stop(&mut self) {
        if let Some(start) = self.start.take() {
            self.elapsed += now_secs() - start;
        }
    }

    pub fn is_running(&self) -> bool {
        self.start.is_some()
    }

    /// Total elapsed seconds, including the in-flight span if running.
    pub fn elapsed(&self) -> f64 {
        match self.start {
            Some(start) => self.elapsed + (now_secs() - start),
            None => self.elapsed,
        }
    }

    pub fn as_value(&self) -> Value {
        serde_json::json!({
            "elapsed": self.elapsed,
            "start": self.start,
        })
    }

    pub fn from_value(value: &Value) -> Self {
        Self {
            elapsed: value.get("elapsed").and_then(Value::as_f64).unwrap_or(0.0),
            start: value.get("start").and_then(Value::as_f64),
        }
    }
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.elapsed == other.elapsed && self.start == other.start
    }
}

/// RAII guard returned by [`crate::metadata::Metadata::timer`]. Stops the
/// named timer when dropped, so a span can be timed with a simple block
/// scope instead of manual start/stop calls.
pub struct TimerGuard<'a> {
    pub(crate) timer: &'a mut Timer,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn accumulates_across_runs() {
        let mut t = Timer::new();
        t.start();
        sleep(Duration::from_millis(5));
        t.stop();
        let first = t.elapsed();
        assert!(first > 0.0);
        t.start();
        sleep(Duration::from_millis(5));
        t.stop();
        assert!(t.elapsed() > first);
    }

    #[test]
    fn round_trips_through_value() {
        let mut t = Timer::new();
        t.start();
        t.stop();
        let v = t.as_value();
        let back = Timer::from_value(&v);
        assert_eq!(t, back);
    }
}
