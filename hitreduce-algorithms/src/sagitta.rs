//! Three-station sagitta consistency filter.
//!
//! A muon from the target or the beam dump bends in the magnet between
//! station 1 and station 2, so the station-1 position is predictable from the
//! station-2 and station-3 hits up to the sagitta at station 2. Chamber hits
//! that do not take part in any consistent (station 3, station 2, station 1)
//! triplet of the same view are dropped.

use crate::filter::{HitFilter, Stage};
use hitreduce_core::{EventHits, ReductionStatistics, TrackingStation};
use hitreduce_geom::{GeometryModel, PlaneType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Sagitta filter constants, lengths in centimeters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SagittaConfig {
    /// z of the target vertex hypothesis.
    pub z_target: f64,
    /// z of the beam-dump vertex hypothesis.
    pub z_dump: f64,
    /// Sagitta scale of the target hypothesis.
    pub target_center: f64,
    /// Relative window of the target hypothesis.
    pub target_width: f64,
    /// Sagitta scale of the dump hypothesis.
    pub dump_center: f64,
    /// Relative window of the dump hypothesis.
    pub dump_width: f64,
    /// Largest accepted slope between the station-2 and station-3 hits.
    pub tx_max: f64,
    /// Smallest half window, in station-1 element spacings.
    pub min_window_cells: f64,
}

impl Default for SagittaConfig {
    fn default() -> Self {
        Self {
            z_target: -129.54,
            z_dump: 42.0,
            target_center: 1.85,
            target_width: 0.25,
            dump_center: 1.5,
            dump_width: 0.3,
            tx_max: 0.15,
            min_window_cells: 0.5,
        }
    }
}

/// Chamber hit prepared for the triplet search.
#[derive(Clone, Copy, Debug)]
struct Candidate {
    index: usize,
    plane_type: PlaneType,
    z: f64,
    pos: f64,
    spacing: f64,
}

/// Projection of a (station 3, station 2) pair under one vertex hypothesis.
#[derive(Clone, Copy, Debug)]
struct Hypothesis {
    z_vertex: f64,
    slope: f64,
    sagitta: f64,
    center: f64,
    width: f64,
}

impl Hypothesis {
    fn new(z_vertex: f64, center: f64, width: f64, d3: &Candidate, d2: &Candidate) -> Self {
        let slope = d3.pos / (d3.z - z_vertex);
        Self {
            z_vertex,
            slope,
            sagitta: d2.pos - slope * (d2.z - z_vertex),
            center,
            width,
        }
    }

    /// Expected station-1 interval.
    fn window(&self, z1: f64, floor: f64) -> (f64, f64) {
        let expected = self.center * self.sagitta + self.slope * (z1 - self.z_vertex);
        let half = (self.sagitta * self.width).abs().max(floor);
        (expected - half, expected + half)
    }
}

/// Keeps chamber hits that belong to a consistent three-station triplet.
#[derive(Clone, Debug)]
pub struct SagittaFilter<'g> {
    config: SagittaConfig,
    geometry: &'g GeometryModel,
}

impl<'g> SagittaFilter<'g> {
    /// Creates a filter.
    pub fn new(config: SagittaConfig, geometry: &'g GeometryModel) -> Self {
        Self { config, geometry }
    }

    /// Filter constants.
    pub fn config(&self) -> &SagittaConfig {
        &self.config
    }

    /// Runs the triplet search over the working set.
    ///
    /// Non-chamber hits pass. Chamber hits without usable geometry are
    /// dropped; hits with an element outside their plane pass. Both are
    /// counted as anomalies.
    pub fn filter(
        &self,
        hits: &EventHits<'_>,
        indices: &[usize],
        stats: &mut ReductionStatistics,
    ) -> Vec<usize> {
        let mut keep = vec![false; hits.len()];
        let mut stations: [Vec<Candidate>; 3] = Default::default();
        let mut warned = HashSet::new();

        for &i in indices {
            let detector_id = hits.detector_id(i);
            let Some(station) = TrackingStation::of(detector_id) else {
                keep[i] = true;
                continue;
            };
            let Some(plane) = self.geometry.plane(detector_id) else {
                if warned.insert(detector_id) {
                    log::warn!("detector {detector_id} missing from geometry; its hits are dropped");
                }
                stats.anomalies.missing_geometry += 1;
                continue;
            };
            if !plane.plane_type().is_geometric() {
                stats.anomalies.unknown_plane_type += 1;
                continue;
            }
            let element_id = hits.element_id(i);
            if !plane.contains_element(element_id) {
                stats.anomalies.element_out_of_range += 1;
                keep[i] = true;
                continue;
            }

            let slot = match station {
                TrackingStation::First => 0,
                TrackingStation::Second => 1,
                TrackingStation::Third => 2,
            };
            stations[slot].push(Candidate {
                index: i,
                plane_type: plane.plane_type(),
                z: plane.z(),
                pos: plane.wire_position(element_id),
                spacing: plane.spacing(),
            });
        }

        let [d1_hits, d2_hits, d3_hits] = &stations;
        for d3 in d3_hits {
            for d2 in d2_hits {
                if d2.plane_type != d3.plane_type {
                    continue;
                }
                if ((d3.pos - d2.pos) / (d2.z - d3.z)).abs() > self.config.tx_max {
                    continue;
                }
                let target = Hypothesis::new(
                    self.config.z_target,
                    self.config.target_center,
                    self.config.target_width,
                    d3,
                    d2,
                );
                let dump = Hypothesis::new(
                    self.config.z_dump,
                    self.config.dump_center,
                    self.config.dump_width,
                    d3,
                    d2,
                );

                for d1 in d1_hits {
                    if d1.plane_type != d3.plane_type {
                        continue;
                    }
                    if keep[d3.index] && keep[d2.index] && keep[d1.index] {
                        continue;
                    }
                    let floor = self.config.min_window_cells * d1.spacing.abs();
                    let (t_lo, t_hi) = target.window(d1.z, floor);
                    let (d_lo, d_hi) = dump.window(d1.z, floor);
                    let (p_min, p_max) = (t_lo.min(d_lo), t_hi.max(d_hi));
                    if p_min < d1.pos && d1.pos < p_max {
                        keep[d3.index] = true;
                        keep[d2.index] = true;
                        keep[d1.index] = true;
                    }
                }
            }
        }

        indices.iter().copied().filter(|&i| keep[i]).collect()
    }
}

impl HitFilter for SagittaFilter<'_> {
    fn apply(
        &self,
        hits: &EventHits<'_>,
        indices: &[usize],
        stats: &mut ReductionStatistics,
    ) -> Vec<usize> {
        self.filter(hits, indices, stats)
    }

    fn stage(&self) -> Stage {
        Stage::Sagitta
    }
}
