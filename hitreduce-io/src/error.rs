//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line of an event file is not a valid event record.
    #[error("line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A parsed event has hit columns of different lengths.
    #[error("line {line}: {source}")]
    Event {
        line: usize,
        #[source]
        source: hitreduce_core::Error,
    },

    /// Serialization of an output record failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] hitreduce_core::Error),
}
