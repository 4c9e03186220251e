use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}: still open")]
    StillOpen(String),

    #[error("{0}: not open")]
    NotOpen(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("unsupported URL scheme `{0}` in {1}")]
    UnsupportedScheme(String, String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no result directories configured for this result's location")]
    NotLocal,
}
