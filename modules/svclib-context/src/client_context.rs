//! The context a `Broker` builds for an outgoing call: binds a tracker and
//! a uid, and forwards only those two onto nested calls it makes on the
//! caller's behalf.

use serde_json::{Map, Value};

use svclib_core::{new_tracker, Metadata};

use crate::context::{default_uid, Context};

pub struct ClientContext {
    name: String,
    metadata: Metadata,
    uid: String,
    tracker: String,
}

impl ClientContext {
    /// `kwargs` are the keyword arguments the caller passed to the
    /// top-level client call; each is recorded as a note on the call's
    /// metadata, and `tracker`/`uid` are pulled out of them if present.
    pub fn new(name: impl Into<String>, kwargs: &Map<String, Value>) -> Self {
        let name = name.into();
        let metadata = Metadata::new(name.clone());
        for (k, v) in kwargs {
            metadata.annotate(k.clone(), v.clone());
        }
        let uid = kwargs
            .get("uid")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(default_uid);
        let tracker = kwargs
            .get("tracker")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(new_tracker);
        metadata.annotate("uid", Value::String(uid.clone()));
        metadata.annotate("tracker", Value::String(tracker.clone()));
        Self {
            name,
            metadata,
            uid,
            tracker,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn tracker(&self) -> &str {
        &self.tracker
    }
}

impl Context for ClientContext {
    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn pre_execute_hook(&self, kwargs: &mut Map<String, Value>) {
        kwargs
            .entry("tracker".to_string())
            .or_insert_with(|| Value::String(self.tracker.clone()));
        kwargs
            .entry("uid".to_string())
            .or_insert_with(|| Value::String(self.uid.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_tracker_and_uid_when_absent() {
        let ctx = ClientContext::new("client", &Map::new());
        assert!(svclib_core::is_valid_tracker(ctx.tracker()));
        assert!(!ctx.uid().is_empty());
    }

    #[test]
    fn pre_execute_hook_only_forwards_tracker_and_uid() {
        let mut kwargs = Map::new();
        kwargs.insert("uid".into(), Value::String("alice".into()));
        let ctx = ClientContext::new("client", &kwargs);

        let mut outgoing = Map::new();
        outgoing.insert("other".into(), Value::from(1));
        ctx.pre_execute_hook(&mut outgoing);

        assert_eq!(outgoing["uid"], Value::String("alice".into()));
        assert_eq!(outgoing["tracker"], Value::String(ctx.tracker().to_string()));
        assert_eq!(outgoing["other"], Value::from(1));
    }

    #[test]
    fn pre_execute_hook_does_not_override_explicit_values() {
        let ctx = ClientContext::new("client", &Map::new());
        let mut outgoing = Map::new();
        outgoing.insert("tracker".into(), Value::String("tracker-deadbeefdeadbeefdeadbeefdeadbeef".into()));
        ctx.pre_execute_hook(&mut outgoing);
        assert_eq!(
            outgoing["tracker"],
            Value::String("tracker-deadbeefdeadbeefdeadbeefdeadbeef".into())
        );
    }
}
