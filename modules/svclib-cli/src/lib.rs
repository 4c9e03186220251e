//! Shared bits for the `svclib-*` command-line binaries: log setup in the
//! style of `logutils.configure_logging()`.

pub mod logging;
