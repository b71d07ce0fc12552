//! Error types for minmax-core.

use thiserror::Error;

/// Result type for minmax-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in minmax-core.
#[derive(Debug, Error)]
pub enum Error {
    /// Run parameters are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A result channel could not be opened.
    #[error("failed to open result channel for worker {ordinal}: {message}")]
    ChannelSetup { ordinal: usize, message: String },

    /// The per-run results directory could not be created.
    #[error("failed to create results directory: {0}")]
    ResultsDirectory(String),

    /// A worker process could not be spawned or handed its assignment.
    #[error("failed to spawn worker {ordinal}: {message}")]
    Spawn { ordinal: usize, message: String },

    /// The worker binary could not be located.
    #[error("worker binary not found: {0}")]
    WorkerNotFound(String),

    /// IPC communication error with a worker process.
    #[error("IPC error: {0}")]
    Ipc(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Error raised inside a worker process.
    #[error("worker error: {0}")]
    Worker(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Render the error together with a recovery hint, when one applies.
    pub fn with_hint(&self) -> String {
        let hint = match self {
            Error::InvalidConfiguration(_) => {
                Some("seed, array size, pnum and timeout must be positive, and pnum must not exceed the array size")
            }
            Error::WorkerNotFound(_) => Some(
                "build the workspace (`cargo build`) or point MINMAX_WORKER_PATH at the minmax-worker binary",
            ),
            Error::Spawn { .. } => Some("check process limits (`ulimit -u`) and that minmax-worker is executable"),
            Error::ResultsDirectory(_) => Some("check that --results-dir exists and is writable"),
            Error::ChannelSetup { .. } => Some("check the open file limit and that the results directory is writable"),
            _ => None,
        };

        match hint {
            Some(hint) => format!("{}\n  hint: {}", self, hint),
            None => self.to_string(),
        }
    }
}
