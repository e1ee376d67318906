use oracle_validation::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("oracle error: {0}")]
    Oracle(#[from] ValidationError),

    #[error("config error: {0}")]
    Config(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("unsupported snapshot version {found}, expected {expected}")]
    SnapshotVersion { found: u32, expected: u32 },

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("logging already initialised: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Task(String),
}
