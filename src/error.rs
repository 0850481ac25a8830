use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Every variant is fatal to the whole run: a worker that drops out leaves
/// the reduction barrier unsatisfiable for everyone else.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("worker {rank} could not allocate scratch space for {requested} points")]
    AllocationFailure { rank: usize, requested: u64 },

    #[error("result sink {} is unavailable: {source}", path.display())]
    SinkUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("worker {rank} left the group before the reduction completed")]
    WorkerLost { rank: usize },

    #[error("reduction closed with {missing} contributions outstanding")]
    ReductionClosed { missing: usize },

    #[error("worker task did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{path}:{line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidConfiguration(message.into())
    }
}
