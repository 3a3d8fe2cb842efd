use thiserror::Error;

/// Failure to read tick counters. Samplers recover from every variant with the degenerate default.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("tick counters unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read tick counters: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed tick counter line: {0:?}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("sampling interval must be a positive number of seconds, got {0}")]
    InvalidInterval(f64),

    #[error("failed to spawn sampling thread: {0}")]
    Spawn(#[source] std::io::Error),
}
