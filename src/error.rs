use thiserror::Error;

pub type Result<T> = std::result::Result<T, StubError>;

#[derive(Debug, Error)]
pub enum StubError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fixture error: {0}")]
    Fixture(#[from] serde_json::Error),

    #[error("Invalid detection pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A callback needed by the requested path was never registered.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Illegal state: {0}")]
    State(String),

    #[error("Parameter out of bounds: {0}")]
    Bounds(usize),

    #[error("Parameter is not set: {0}")]
    Unbound(usize),

    #[error("Not supported: {0}")]
    Unsupported(String),

    /// Raised by handler logic; surfaced to the statement caller as is.
    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Invalid: {0}")]
    InvalidArgument(String),

    #[error("Batch failed at entry {index}: {source}")]
    Batch {
        index: usize,
        counts: Vec<Option<u64>>,
        #[source]
        source: Box<StubError>,
    },
}

impl StubError {
    pub(crate) fn closed() -> Self {
        StubError::State("closed".into())
    }

    pub(crate) fn not_on_row() -> Self {
        StubError::State("not on a row".into())
    }
}
