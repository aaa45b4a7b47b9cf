//! Error types for the pipeline system.

use std::sync::Arc;

use thiserror::Error as ThisError;

type BoxedError = Arc<dyn std::error::Error + Send + Sync>;

/// The main error type for the pipeline system.
#[derive(Debug, Clone, ThisError)]
pub enum Error {
    /// A source failed to produce an item
    #[error("Source error: {0}")]
    Source(#[source] BoxedError),

    /// A stage function failed on an item
    #[error("Stage error: {0}")]
    Stage(#[source] BoxedError),

    /// A sink failed to accept an item
    #[error("Sink error: {0}")]
    Sink(#[source] BoxedError),

    /// The pipeline was wired in a way that cannot run correctly
    #[error("Topology error: {0}")]
    Topology(String),

    /// Every consumer of a queue went away before the producer finished
    #[error("Channel was closed unexpectedly")]
    ChannelClosed,

    /// The pipeline was cancelled
    #[error("Pipeline was shut down")]
    Shutdown,

    /// A pipeline task panicked or was aborted
    #[error("Task panicked: {0}")]
    TaskPanicked(String),

    /// A custom error with a message
    #[error("{0}")]
    Custom(String),

    /// Several tasks failed
    #[error("Multiple errors occurred: {}", format_multiple(.0))]
    Multiple(Vec<Error>),
}

fn format_multiple(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| format!("[{}]", e))
        .collect::<Vec<_>>()
        .join(", ")
}

// Convenience constructors
impl Error {
    /// Create a source error from any error type
    pub fn source_error<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Error::Source(Arc::new(error))
    }

    /// Create a stage error from any error type
    pub fn stage<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Error::Stage(Arc::new(error))
    }

    /// Create a sink error from any error type
    pub fn sink<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Error::Sink(Arc::new(error))
    }

    /// Create a topology error
    pub fn topology<S: Into<String>>(message: S) -> Self {
        Error::Topology(message.into())
    }

    /// Create a custom error with a message
    pub fn custom<S: Into<String>>(message: S) -> Self {
        Error::Custom(message.into())
    }

    /// Whether this error only reports that the pipeline was cancelled.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Error::Shutdown)
    }

    /// Collapse a list of task failures into one error.
    ///
    /// Cancellation noise is dropped when a real cause is present.
    pub fn from_many(mut errors: Vec<Error>) -> Option<Self> {
        if errors.is_empty() {
            return None;
        }
        errors.retain(|e| !e.is_shutdown());
        match errors.len() {
            0 => Some(Error::Shutdown),
            1 => errors.pop(),
            _ => Some(Error::Multiple(errors)),
        }
    }
}

// Common conversions
impl<T> From<tokio::sync::mpsc::error::SendError<T>> for Error {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Error::ChannelClosed
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            Error::Shutdown
        } else {
            Error::TaskPanicked(err.to_string())
        }
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for Error {
    fn from(e: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Error::Custom(e.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Custom(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Custom(s.to_string())
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Helper trait for converting errors into our Error type
pub trait IntoError<T> {
    fn into_source_error(self) -> Result<T>;
    fn into_stage_error(self) -> Result<T>;
    fn into_sink_error(self) -> Result<T>;
}

impl<T, E> IntoError<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn into_source_error(self) -> Result<T> {
        self.map_err(Error::source_error)
    }

    fn into_stage_error(self) -> Result<T> {
        self.map_err(Error::stage)
    }

    fn into_sink_error(self) -> Result<T> {
        self.map_err(Error::sink)
    }
}
