//! hitreduce-geom: Detector plane geometry and chamber-to-hodoscope masks.
//!
//! This crate describes the spectrometer's planes and answers the
//! positional questions the reduction filters ask: where a wire sits, which
//! element a projected track position falls on, and which hodoscope paddles
//! can share a track with a given chamber element.
//!
//! # Key Components
//!
//! - [`GeometryModel`] - All planes keyed by detector id, loaded from the
//!   plane-parameter table
//! - [`Plane`] - Wire positions, element boxes and inverse lookup for one plane
//! - [`LookupTableBuilder`] - Builds the [`ChamberHodoLut`] once per run
//!
//! # Example
//!
//! ```
//! use hitreduce_geom::{GeometryModel, PlaneParams};
//!
//! let geometry = GeometryModel::from_params([
//!     PlaneParams::new("D0X", 10, 2.0, 600.0),
//! ])
//! .unwrap();
//! let plane = geometry.plane(1).unwrap();
//! assert_eq!(plane.expected_element_id(plane.wire_position(4)), 4);
//! ```

mod error;
pub mod lut;
pub mod model;
pub mod plane;

pub use error::{Error, Result};
pub use lut::{ChamberHodoLut, LookupTableBuilder, LutBuildReport, LutConfig};
pub use model::GeometryModel;
pub use plane::{ElementBox, Plane, PlaneParams, PlaneType};
