//! The state every call carries regardless of which side of the wire it's
//! on: a name for logging, and the [`Metadata`] tree being built up as the
//! call progresses.

use serde_json::{Map, Value};

use svclib_core::Metadata;

/// Common surface shared by [`crate::ClientContext`] and
/// [`crate::ServiceContext`]. Kept as a trait (rather than a shared base
/// struct with inheritance, which Rust doesn't have) so call sites that
/// only need the common bits can take `&dyn Context`.
pub trait Context: Send + Sync {
    fn name(&self) -> &str;
    fn metadata(&self) -> &Metadata;

    fn annotate(&self, key: &str, value: Value) {
        self.metadata().annotate(key.to_string(), value);
    }

    fn update_metadata(&self, other: &Metadata) {
        self.metadata().update_metadata(other);
    }

    /// Defaults to apply to a nested outgoing call's kwargs before it is
    /// dispatched. `ClientContext` only forwards `tracker`/`uid`;
    /// `ServiceContext` forwards everything in its own request's kwargs.
    fn pre_execute_hook(&self, kwargs: &mut Map<String, Value>);
}

/// Falls back to `$USER`, matching the original's `pwd.getpwuid` /
/// environment lookup when no explicit uid is given.
pub fn default_uid() -> String {
    std::env::var("USER").unwrap_or_else(|_| "unknown".to_string())
}
