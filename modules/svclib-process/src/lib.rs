//! Subprocess execution: spawn a command, capture its combined output
//! (truncated past a configurable budget), and turn its exit into either
//! a result value or a structured failure.

pub mod errors;
pub mod handler;
pub mod process;
pub mod runner;

pub use errors::ProcessError;
pub use handler::ProcessHandler;
pub use process::{ProcessSpec, DEFAULT_MAX_PROCESS_OUTPUT_SIZE};
pub use runner::run;
