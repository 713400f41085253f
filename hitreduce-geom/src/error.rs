//! Geometry error types.

use thiserror::Error;

/// Result type for geometry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Geometry error types.
#[derive(Error, Debug)]
pub enum Error {
    /// A row of the plane-parameter table could not be parsed.
    #[error("geometry table line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// A plane has parameters that make its geometry meaningless.
    #[error("invalid plane {detector_id} ({name}): {message}")]
    InvalidPlane {
        detector_id: i32,
        name: String,
        message: String,
    },

    /// The table did not contain any plane.
    #[error("geometry table is empty")]
    EmptyTable,

    /// JSON error while reading or writing a lookup table.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
