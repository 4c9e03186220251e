//! Result cache: a raw key/value [`Cache`] backend plus [`CacheControl`],
//! the decorator that gives cached entries single-flight semantics and
//! (optionally) validates cached URLs are still live before serving them.

pub mod backend;
pub mod control;
pub mod errors;

pub use backend::{get_response, Cache, NoopCache, RedisCache, IN_FLIGHT};
pub use control::CacheControl;
pub use errors::CacheError;
