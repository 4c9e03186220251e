use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no URL registered for service `{name}` (local_only: {local_only})")]
    NoUrl { name: String, local_only: bool },

    #[error("registry backend error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for RegistryError {
    fn from(err: redis::RedisError) -> Self {
        RegistryError::Backend(err.to_string())
    }
}
