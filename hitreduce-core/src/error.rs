//! Error types for hitreduce-core.

use thiserror::Error;

/// Result type alias for hitreduce operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for hitreduce operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The per-event hit columns do not have the same length.
    #[error(
        "hit columns differ in length: detector_id={detector_id}, element_id={element_id}, \
         drift_distance={drift_distance}, tdc_time={tdc_time}"
    )]
    LengthMismatch {
        detector_id: usize,
        element_id: usize,
        drift_distance: usize,
        tdc_time: usize,
    },

    /// An index in a working set points past the end of the event.
    #[error("hit index {index} out of range for event with {len} hits")]
    IndexOutOfRange { index: usize, len: usize },

    /// A stage that needs the detector geometry was enabled without one.
    #[error("stage '{0}' requires a geometry model but none was supplied")]
    MissingGeometry(&'static str),
}
