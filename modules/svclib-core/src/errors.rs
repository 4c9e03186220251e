//! Structured, wire-serializable error taxonomy shared by workers and
//! clients. Every variant carries enough information to be reconstructed
//! on the other side of an HTTP call via [`ServiceError::from_wire`].

use std::collections::HashMap;
use std::sync::OnceLock;

use serde_json::{Map, Value};
use thiserror::Error;

/// How a failed call should be retried by the client broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retry {
    No,
    Immediately,
    After(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    BadRequest,
    CommError,
    Timeout,
    RetryLater,
    ServiceError,
    TaskError,
    /// An error type this build doesn't recognize, preserved verbatim so
    /// it can still be logged and re-serialized.
    Unknown(String),
}

impl ErrorKind {
    fn wire_name(&self) -> String {
        match self {
            ErrorKind::BadRequest => "servicelib.errors.BadRequest".to_string(),
            ErrorKind::CommError => "servicelib.errors.CommError".to_string(),
            ErrorKind::Timeout => "servicelib.errors.Timeout".to_string(),
            ErrorKind::RetryLater => "servicelib.errors.RetryLater".to_string(),
            ErrorKind::ServiceError => "servicelib.errors.ServiceError".to_string(),
            ErrorKind::TaskError => "servicelib.errors.TaskError".to_string(),
            ErrorKind::Unknown(name) => name.clone(),
        }
    }
}

/// A service-level failure, serializable over the wire with enough
/// structure for the receiving side to reconstruct it, attribute it to
/// the service/host that raised it, and decide whether to retry.
#[derive(Debug, Clone, Error)]
#[error("{}", self.message())]
pub struct ServiceError {
    pub kind: ErrorKind,
    pub args: Vec<Value>,
    pub service: Option<String>,
    pub origin: Option<String>,
    pub wrapped_exc_type: Option<String>,
    pub wrapped_exc_args: Option<Vec<Value>>,
    pub wrapped_exc_tb: Option<Vec<String>>,
}

impl ServiceError {
    fn new(kind: ErrorKind, args: Vec<Value>) -> Self {
        Self {
            kind,
            args,
            service: None,
            origin: None,
            wrapped_exc_type: None,
            wrapped_exc_args: None,
            wrapped_exc_tb: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, vec![Value::String(message.into())])
    }

    pub fn comm_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CommError, vec![Value::String(message.into())])
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, vec![Value::String(message.into())])
    }

    pub fn retry_later(message: impl Into<String>, delay_secs: i64) -> Self {
        Self::new(
            ErrorKind::RetryLater,
            vec![Value::String(message.into()), Value::from(delay_secs)],
        )
    }

    pub fn service_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceError, vec![Value::String(message.into())])
    }

    pub fn task_error(
        service: impl Into<String>,
        origin: impl Into<String>,
        exc_type: impl Into<String>,
        message: impl Into<String>,
        traceback: Vec<String>,
    ) -> Self {
        let mut err = Self::new(ErrorKind::TaskError, Vec::new());
        err.service = Some(service.into());
        err.origin = Some(origin.into());
        err.wrapped_exc_type = Some(exc_type.into());
        err.wrapped_exc_args = Some(vec![Value::String(message.into())]);
        err.wrapped_exc_tb = Some(traceback);
        err
    }

    pub fn with_origin(mut self, service: impl Into<String>, origin: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self.origin = Some(origin.into());
        self
    }

    /// HTTP status code a worker should answer with when this error
    /// escapes a call.
    pub fn http_status(&self) -> u16 {
        match &self.kind {
            ErrorKind::BadRequest => 400,
            ErrorKind::CommError => 503,
            ErrorKind::Timeout => 503,
            ErrorKind::RetryLater => 503,
            ErrorKind::ServiceError => 500,
            ErrorKind::TaskError => 500,
            ErrorKind::Unknown(_) => 500,
        }
    }

    /// HTTP status codes a client-side broker should treat as worth
    /// reconstructing into a [`ServiceError`] rather than a raw transport
    /// failure.
    pub fn from_http_status(status: u16) -> bool {
        matches!(status, 400 | 500 | 503)
    }

    pub fn retry(&self) -> Retry {
        match &self.kind {
            ErrorKind::CommError | ErrorKind::Timeout => Retry::Immediately,
            ErrorKind::RetryLater => {
                let delay = self.args.get(1).and_then(Value::as_i64).unwrap_or(1);
                Retry::After(delay)
            }
            ErrorKind::BadRequest
            | ErrorKind::ServiceError
            | ErrorKind::TaskError
            | ErrorKind::Unknown(_) => Retry::No,
        }
    }

    pub fn message(&self) -> String {
        match &self.kind {
            ErrorKind::TaskError => {
                let exc_type = self.wrapped_exc_type.as_deref().unwrap_or("Exception");
                let args = self
                    .wrapped_exc_args
                    .as_ref()
                    .map(|a| {
                        a.iter()
                            .map(|v| match v {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            })
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_default();
                format!("{exc_type}: {args}")
            }
            _ => self
                .args
                .first()
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| self.kind.wire_name()),
        }
    }

    /// Serializes this error to the wire representation exchanged over
    /// HTTP response bodies.
    pub fn to_wire(&self) -> Value {
        let mut map = Map::new();
        map.insert("exc_type".into(), Value::String(self.kind.wire_name()));
        map.insert(
            "exc_service".into(),
            self.service.clone().map(Value::String).unwrap_or(Value::Null),
        );
        map.insert(
            "exc_origin".into(),
            self.origin.clone().map(Value::String).unwrap_or(Value::Null),
        );
        if self.kind == ErrorKind::TaskError {
            map.insert(
                "wrapped_exc_type".into(),
                self.wrapped_exc_type
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            );
            map.insert(
                "wrapped_exc_args".into(),
                Value::Array(self.wrapped_exc_args.clone().unwrap_or_default()),
            );
            map.insert(
                "wrapped_exc_tb".into(),
                Value::Array(
                    self.wrapped_exc_tb
                        .clone()
                        .unwrap_or_default()
                        .into_iter()
                        .map(Value::String)
                        .collect(),
                ),
            );
        } else {
            map.insert("exc_args".into(), Value::Array(self.args.clone()));
        }
        Value::Object(map)
    }

    /// Reconstructs a [`ServiceError`] from a wire payload produced by
    /// [`ServiceError::to_wire`], consulting the deserializer registry for
    /// known `exc_type` names and falling back to [`ErrorKind::Unknown`].
    pub fn from_wire(value: &Value) -> Self {
        let exc_type = value.get("exc_type").and_then(Value::as_str).unwrap_or("");
        if let Some(f) = registry().get(exc_type) {
            return f(value);
        }
        from_base(ErrorKind::Unknown(exc_type.to_string()), value)
    }
}

fn from_base(kind: ErrorKind, value: &Value) -> ServiceError {
    let mut err = ServiceError::new(
        kind,
        value
            .get("exc_args")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
    );
    err.service = value
        .get("exc_service")
        .and_then(Value::as_str)
        .map(str::to_string);
    err.origin = value
        .get("exc_origin")
        .and_then(Value::as_str)
        .map(str::to_string);
    err
}

fn from_task_error(value: &Value) -> ServiceError {
    let mut err = from_base(ErrorKind::TaskError, value);
    err.wrapped_exc_type = value
        .get("wrapped_exc_type")
        .and_then(Value::as_str)
        .map(str::to_string);
    err.wrapped_exc_args = value
        .get("wrapped_exc_args")
        .and_then(Value::as_array)
        .cloned();
    err.wrapped_exc_tb = value.get("wrapped_exc_tb").and_then(Value::as_array).map(|a| {
        a.iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    });
    err
}

type Deserializer = fn(&Value) -> ServiceError;

fn registry() -> &'static HashMap<&'static str, Deserializer> {
    static REGISTRY: OnceLock<HashMap<&'static str, Deserializer>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut m: HashMap<&'static str, Deserializer> = HashMap::new();
        m.insert("servicelib.errors.BadRequest", |v| {
            from_base(ErrorKind::BadRequest, v)
        });
        m.insert("servicelib.errors.CommError", |v| {
            from_base(ErrorKind::CommError, v)
        });
        m.insert("servicelib.errors.Timeout", |v| {
            from_base(ErrorKind::Timeout, v)
        });
        m.insert("servicelib.errors.RetryLater", |v| {
            from_base(ErrorKind::RetryLater, v)
        });
        m.insert("servicelib.errors.ServiceError", |v| {
            from_base(ErrorKind::ServiceError, v)
        });
        m.insert("servicelib.errors.TaskError", from_task_error);
        m
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_bad_request() {
        let err = ServiceError::bad_request("missing field 'foo'");
        let wire = err.to_wire();
        let back = ServiceError::from_wire(&wire);
        assert_eq!(back.kind, ErrorKind::BadRequest);
        assert_eq!(back.http_status(), 400);
        assert_eq!(back.message(), "missing field 'foo'");
    }

    #[test]
    fn retry_later_carries_delay() {
        let err = ServiceError::retry_later("try later", 5);
        assert_eq!(err.retry(), Retry::After(5));
        let back = ServiceError::from_wire(&err.to_wire());
        assert_eq!(back.retry(), Retry::After(5));
    }

    #[test]
    fn task_error_round_trips_wrapped_fields() {
        let err = ServiceError::task_error(
            "hello",
            "worker-1",
            "ValueError",
            "boom",
            vec!["line 1".into()],
        );
        let back = ServiceError::from_wire(&err.to_wire());
        assert_eq!(back.kind, ErrorKind::TaskError);
        assert_eq!(back.wrapped_exc_type.as_deref(), Some("ValueError"));
        assert_eq!(back.message(), "ValueError: boom");
    }

    #[test]
    fn unknown_exc_type_falls_back() {
        let wire = serde_json::json!({
            "exc_type": "some.other.lib.WeirdError",
            "exc_args": ["oops"],
            "exc_service": null,
            "exc_origin": null,
        });
        let back = ServiceError::from_wire(&wire);
        assert!(matches!(back.kind, ErrorKind::Unknown(_)));
        assert_eq!(back.http_status(), 500);
    }
}
