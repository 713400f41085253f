//! Error types for building and configuring the reducer.

use thiserror::Error;

/// Result type for reducer setup.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring the reduction pipeline.
///
/// Filtering itself never fails; these all surface at startup.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The hodoscope mask was enabled without a lookup table.
    #[error("stage 'hodomask' requires a chamber-to-hodoscope lookup table but none was supplied")]
    MissingLookupTable,

    /// Malformed configuration JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while reading a configuration file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] hitreduce_core::Error),
}
