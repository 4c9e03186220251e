//! The part of running a subprocess that's specific to each command: how
//! to turn its captured output into a result, what counts as failure, and
//! (optionally) sub-timers to merge into the caller's metadata.

use serde_json::{Map, Value};

use svclib_core::errors::ServiceError;

/// Implemented once per kind of subprocess a service shells out to.
/// [`crate::runner::ProcessRunner`] drives the generic plumbing (spawn,
/// capture, truncate, wait); this is the part that knows what the output
/// means.
pub trait ProcessHandler: Send {
    /// Builds the service's return value from the captured combined
    /// stdout/stderr. Called only when the process exits with status 0.
    fn results(&mut self, output: &[u8]) -> Result<Value, ServiceError>;

    /// Runs regardless of exit status, before failure is reported.
    fn cleanup(&mut self) {}

    /// Called when the process exits non-zero or is killed by a signal.
    fn failed(&mut self, _rc: Option<i32>, _signal: Option<i32>) {}

    /// Sub-timers this handler tracked internally (e.g. time spent in a
    /// setup phase before the child process was even spawned), merged
    /// into the parent call's metadata once the process finishes.
    fn timers(&self) -> Option<Map<String, Value>> {
        None
    }
}
