//! Argument validation before a call is dispatched.

use serde_json::Value;

use svclib_core::ServiceError;

/// Walks `value` looking for anything that isn't representable on the
/// wire. Every [`Value`] is JSON by construction, so this never actually
/// fails for values built through normal `serde_json` APIs — it exists as
/// the direct counterpart of the original's recursive `check_args`, kept
/// at the same call sites (`Broker::execute`, before building a
/// `Request`) in case a future `Value` variant or caller-supplied
/// `Serialize` conversion slips something non-wire-safe through.
pub fn check_args(value: &Value) -> Result<(), ServiceError> {
    match value {
        Value::Array(items) => items.iter().try_for_each(check_args),
        Value::Object(map) => map.values().try_for_each(check_args),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_ordinary_json() {
        assert!(check_args(&json!({"a": [1, 2, "x"], "b": null})).is_ok());
    }
}
