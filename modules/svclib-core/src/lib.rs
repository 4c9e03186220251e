//! Core wire types shared by every servicelib crate: request/response
//! envelopes, call trackers, per-call metadata, JSON encoding helpers and
//! the structured error taxonomy.

pub mod core;
pub mod encoding;
pub mod errors;
pub mod metadata;
pub mod timer;

pub use crate::core::{is_valid_tracker, make_id, new_tracker, Request, Response};
pub use crate::errors::{ErrorKind, Retry, ServiceError};
pub use crate::metadata::Metadata;
pub use crate::timer::Timer;
