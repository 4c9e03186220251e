//! Request/response envelopes and the identifiers carried in every call:
//! trackers (a tracer id threaded through a whole dispatch chain) and
//! cache-key fingerprints (a content hash of a call's arguments).

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::encoding;
use crate::errors::ServiceError;
use crate::metadata::Metadata;

const HEADER_PREFIX: &str = "x-servicelib-";

/// Generates an id of the form `{prefix}-{32 hex chars}`.
pub fn make_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}

pub fn new_tracker() -> String {
    make_id("tracker")
}

fn tracker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^tracker-[0-9a-f]{32}$").expect("static regex is valid"))
}

pub fn is_valid_tracker(value: &str) -> bool {
    tracker_regex().is_match(value)
}

/// A call about to be dispatched to a named service: positional args plus
/// reserved/free-form keyword args (`tracker`, `uid`, `cache`, `timeout`
/// are recognized; anything else is forwarded to the handler verbatim).
#[derive(Debug, Clone)]
pub struct Request {
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

impl Request {
    pub fn new(args: Vec<Value>, mut kwargs: Map<String, Value>) -> Self {
        kwargs
            .entry("tracker".to_string())
            .or_insert_with(|| Value::String(new_tracker()));
        Self { args, kwargs }
    }

    pub fn tracker(&self) -> String {
        self.kwargs
            .get("tracker")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(new_tracker)
    }

    pub fn uid(&self) -> Option<String> {
        self.kwargs
            .get("uid")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn cache_enabled(&self) -> bool {
        self.kwargs.get("cache").and_then(Value::as_bool).unwrap_or(true)
    }

    pub fn timeout(&self) -> Option<f64> {
        self.kwargs.get("timeout").and_then(Value::as_f64)
    }

    /// Content fingerprint used as a cache key: the lowercase hex MD5 of
    /// the canonical JSON encoding of `[service, args, [[k,v], ...]]`,
    /// with the kwargs pairs sorted by key. `kwargs` here excludes
    /// `tracker`, since a tracker should not affect whether two calls are
    /// considered the same cached computation. The third element is a
    /// sorted array of pairs, not a JSON object, matching `cache.py`'s
    /// `list(kwargs.items())` exactly.
    pub fn cache_key(&self, service: &str) -> String {
        let mut pairs: Vec<(&String, &Value)> = self
            .kwargs
            .iter()
            .filter(|(k, _)| k.as_str() != "tracker")
            .collect();
        pairs.sort_by(|(a, _), (b, _)| a.cmp(b));
        let kwargs_for_key: Vec<Value> = pairs
            .into_iter()
            .map(|(k, v)| Value::Array(vec![Value::String(k.clone()), v.clone()]))
            .collect();
        let payload = Value::Array(vec![
            Value::String(service.to_string()),
            Value::Array(self.args.clone()),
            Value::Array(kwargs_for_key),
        ]);
        let encoded = encoding::canonical_dumps(&payload);
        format!("{:x}", md5::compute(encoded.as_bytes()))
    }

    pub fn http_headers(&self) -> HashMap<String, String> {
        self.kwargs
            .iter()
            .map(|(k, v)| (format!("{HEADER_PREFIX}{k}"), encoding::dumps(v)))
            .collect()
    }

    pub fn http_body(&self) -> Vec<u8> {
        encoding::dumps(&Value::Array(self.args.clone())).into_bytes()
    }

    pub fn from_http(body: &[u8], headers: &HashMap<String, String>) -> Result<Self, ServiceError> {
        let args = if body.is_empty() {
            Vec::new()
        } else {
            let text = std::str::from_utf8(body)
                .map_err(|e| ServiceError::bad_request(format!("request body is not utf-8: {e}")))?;
            match encoding::loads(text) {
                Ok(Value::Array(items)) => items,
                Ok(_) => {
                    return Err(ServiceError::bad_request(
                        "request body must be a JSON array of positional arguments",
                    ))
                }
                Err(e) => return Err(ServiceError::bad_request(format!("invalid JSON body: {e}"))),
            }
        };
        let mut kwargs = Map::new();
        for (key, value) in headers {
            if let Some(name) = key.strip_prefix(HEADER_PREFIX) {
                if name == "kids" || name == "timers" || name.starts_with("note-") {
                    continue;
                }
                let parsed = encoding::loads(value)
                    .map_err(|e| ServiceError::bad_request(format!("invalid header {key}: {e}")))?;
                kwargs.insert(name.to_string(), parsed);
            }
        }
        Ok(Self::new(args, kwargs))
    }
}

/// Outcome of a dispatched call: either a JSON success value or a
/// structured [`ServiceError`], plus the metadata accumulated while
/// producing it.
#[derive(Clone)]
pub struct Response {
    pub outcome: Result<Value, ServiceError>,
    pub metadata: Metadata,
}

impl Response {
    pub fn ok(value: Value, metadata: Metadata) -> Self {
        Self {
            outcome: Ok(value),
            metadata,
        }
    }

    pub fn err(error: ServiceError, metadata: Metadata) -> Self {
        Self {
            outcome: Err(error),
            metadata,
        }
    }

    pub fn http_status(&self) -> u16 {
        match &self.outcome {
            Ok(_) => 200,
            Err(e) => e.http_status(),
        }
    }

    pub fn http_headers(&self) -> HashMap<String, String> {
        self.metadata.as_http_headers()
    }

    pub fn http_body(&self) -> Vec<u8> {
        let value = match &self.outcome {
            Ok(v) => v.clone(),
            Err(e) => e.to_wire(),
        };
        encoding::dumps(&value).into_bytes()
    }

    pub fn from_http(
        status: u16,
        body: &[u8],
        headers: &HashMap<String, String>,
    ) -> Result<Self, ServiceError> {
        let text = std::str::from_utf8(body)
            .map_err(|e| ServiceError::comm_error(format!("response body is not utf-8: {e}")))?;
        let value = if text.is_empty() {
            Value::Null
        } else {
            encoding::loads(text)
                .map_err(|e| ServiceError::comm_error(format!("invalid JSON response: {e}")))?
        };
        let metadata = Metadata::from_http_headers(headers);
        if ServiceError::from_http_status(status) && status != 200 {
            Ok(Self::err(ServiceError::from_wire(&value), metadata))
        } else if status == 200 {
            Ok(Self::ok(value, metadata))
        } else {
            Ok(Self::err(
                ServiceError::comm_error(format!("unexpected HTTP status {status}")),
                metadata,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_format_is_valid() {
        let t = new_tracker();
        assert!(is_valid_tracker(&t));
        assert!(!is_valid_tracker("tracker-not-hex"));
        assert!(!is_valid_tracker("bogus-deadbeef"));
    }

    #[test]
    fn cache_key_ignores_tracker_and_kwarg_order() {
        let mut kw1 = Map::new();
        kw1.insert("b".into(), Value::from(2));
        kw1.insert("a".into(), Value::from(1));
        kw1.insert("tracker".into(), Value::String(new_tracker()));
        let r1 = Request::new(vec![Value::from(1)], kw1);

        let mut kw2 = Map::new();
        kw2.insert("a".into(), Value::from(1));
        kw2.insert("b".into(), Value::from(2));
        kw2.insert("tracker".into(), Value::String(new_tracker()));
        let r2 = Request::new(vec![Value::from(1)], kw2);

        assert_eq!(r1.cache_key("hello"), r2.cache_key("hello"));
    }

    #[test]
    fn cache_key_differs_by_service_name() {
        let r = Request::new(vec![Value::from(1)], Map::new());
        assert_ne!(r.cache_key("hello"), r.cache_key("other"));
    }

    #[test]
    fn request_round_trips_through_http() {
        let mut kwargs = Map::new();
        kwargs.insert("uid".into(), Value::String("u-1".into()));
        let req = Request::new(vec![Value::from(1), Value::String("x".into())], kwargs);
        let headers = req.http_headers();
        let body = req.http_body();
        let back = Request::from_http(&body, &headers).unwrap();
        assert_eq!(back.args, req.args);
        assert_eq!(back.uid(), req.uid());
    }
}
