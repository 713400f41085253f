//! hitreduce-core: Core types for per-event detector hit reduction.
//!
//! This crate provides the hit data model shared by every stage of the
//! reduction pipeline, the detector id layout, and the statistics types
//! used to report what a run removed.
//!

pub mod detector;
pub mod error;
pub mod hit;
pub mod soa;
pub mod statistics;

pub use detector::{Station, TrackingStation, UniqueId, N_CHAMBER_PLANES};
pub use error::{Error, Result};
pub use hit::{EventHits, HitData};
pub use soa::HitColumns;
pub use statistics::{
    AnomalyCounts, ReductionStatistics, RunStatistics, StageCounts, StationCounts,
};
