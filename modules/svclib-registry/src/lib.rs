//! Service registry: maps a service name to the set of worker URLs
//! currently serving it.

pub mod cached;
pub mod errors;
pub mod memory_registry;
pub mod redis_registry;
pub mod registry;

pub use cached::CachedRegistry;
pub use errors::RegistryError;
pub use memory_registry::MemoryRegistry;
pub use redis_registry::RedisRegistry;
pub use registry::{services_by_netloc, Registry};
