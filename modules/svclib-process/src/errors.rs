use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to start '{cmdline}': {source}")]
    Spawn {
        cmdline: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{name}' killed by signal {signal}:\n{cmdline}\n{output}")]
    Killed {
        name: String,
        signal: i32,
        cmdline: String,
        output: String,
    },

    #[error("'{name}' failed, return code {rc}:\n{cmdline}\n{output}")]
    NonZeroExit {
        name: String,
        rc: i32,
        cmdline: String,
        output: String,
    },

    #[error("I/O error while running process: {0}")]
    Io(#[from] std::io::Error),
}
