use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("config load: {path}: {message}")]
    ConfigLoad { path: String, message: String },

    #[error("config: {message}")]
    Config { message: String },

    #[error("connection: {target}: {message}")]
    Connect { target: String, message: String },

    #[error("query: {target}: {message}")]
    Query { target: String, message: String },

    #[error("worker: {target}: {message}")]
    Worker { target: String, message: String },

    #[error("all {count} target(s) failed, no data to write")]
    AllTargetsFailed { count: usize },

    #[error("write: {message}")]
    Write { message: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl CollectorError {
    /// The target host this error is tagged with, if it came from a single target.
    pub fn target(&self) -> Option<&str> {
        match self {
            CollectorError::Connect { target, .. }
            | CollectorError::Query { target, .. }
            | CollectorError::Worker { target, .. } => Some(target),
            _ => None,
        }
    }
}
