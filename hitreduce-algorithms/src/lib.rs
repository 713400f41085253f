//! hitreduce-algorithms: Hit reduction stages and the event reducer.
//!
//! This crate provides the per-event filter stages:
//! - **Dedup** - first hit per (detector, element) wins
//! - **Out-of-time** - uniform or per-station TDC windows
//! - **Decluster** - adjacent-wire cluster reduction
//! - **Hodoscope mask** - chamber hits must line up with a fired paddle
//! - **Sagitta** - three-station triplet consistency
//!
//! and [`EventReducer`], which runs the enabled stages in that order.
//!
//! ```
//! use hitreduce_algorithms::{EventReducer, ReductionConfig};
//! use hitreduce_core::EventHits;
//!
//! let det = [3, 3, 3, 40];
//! let elem = [10, 11, 10, 1];
//! let drift = [0.1, 0.2, 0.1, 0.0];
//! let tdc = [950.0, 951.0, 950.0, 940.0];
//! let hits = EventHits::new(&det, &elem, &drift, &tdc).unwrap();
//!
//! let reducer = EventReducer::new(ReductionConfig::default(), None, None).unwrap();
//! let reduction = reducer.reduce(&hits);
//! assert_eq!(reduction.kept, vec![0, 1, 3]);
//! ```

mod config;
mod decluster;
mod dedup;
mod error;
mod filter;
mod hodo_mask;
mod occupancy;
mod processing;
mod sagitta;
mod timing;

pub use config::ReductionConfig;
pub use decluster::{
    half_cell_width, ClusterWidth, DeclusterConfig, DeclusterEngine, TwoHitOrder,
    BURST_MEAN_DT, D3P_COINCIDENCE_WINDOW,
};
pub use dedup::{deduplicate, Deduplicator};
pub use error::{Error, Result};
pub use filter::{HitFilter, Stage};
pub use hodo_mask::{HodoMaskFilter, MissingLutPolicy, DEFAULT_HODO_IDS};
pub use occupancy::{accept_event, OccupancyLimits};
pub use processing::{summarize, EventReducer, Reduction};
pub use sagitta::{SagittaConfig, SagittaFilter};
pub use timing::{OutOfTimeFilter, OutOfTimePolicy, StationWindows, TdcRange, TimeWindow};
