use tracing_subscriber::EnvFilter;

/// Initializes a `tracing` subscriber from `RUST_LOG`, falling back to
/// `level` when it isn't set. Mirrors `logutils.configure_logging(level)`.
pub fn configure(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
