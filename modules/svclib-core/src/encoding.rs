//! JSON wire encoding helpers shared by requests, responses, and errors.

use serde_json::Value;

/// Serializes a value to a compact JSON string, matching the wire format
/// used for call arguments, keyword headers, and error payloads.
pub fn dumps(value: &Value) -> String {
    serde_json::to_string(value).expect("Value serialization cannot fail")
}

/// Deserializes a JSON string into a [`Value`].
pub fn loads(data: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(data)
}

/// Canonical encoding used for cache-key fingerprints: object keys are
/// always sorted (guaranteed by `serde_json::Map`'s `BTreeMap` backing)
/// and whitespace is omitted.
pub fn canonical_dumps(value: &Value) -> String {
    dumps(value)
}
