use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no value for config key `{0}`")]
    KeyNotFound(String),

    #[error("unsupported config URL scheme `{0}`")]
    UnsupportedScheme(String),

    #[error("config source is read-only")]
    ReadOnly,

    #[error("error reading config source: {0}")]
    Source(String),

    #[error("invalid config key `{0}`")]
    InvalidKey(String),
}
