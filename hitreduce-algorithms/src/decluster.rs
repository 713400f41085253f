//! Declustering of adjacent chamber hits.
//!
//! Hits are scanned in (detector, element) order. Runs of hits on the same
//! plane whose element ids step by at most one form a cluster; each cluster
//! is reduced to its likely genuine members by [`DeclusterEngine::process_cluster`].
//!
//! # Cluster rules
//!
//! - One hit: kept.
//! - Two hits: a drift rule drops the hit with the larger drift distance when
//!   both drifts look like a track passing between the wires, and a timing
//!   rule drops both hits on D3p planes when they are nearly coincident.
//! - Three or more: a burst with small mean TDC spacing is dropped, otherwise
//!   only the two edge hits survive.

use crate::filter::{HitFilter, Stage};
use hitreduce_core::{AnomalyCounts, EventHits, ReductionStatistics, N_CHAMBER_PLANES};
use hitreduce_geom::GeometryModel;
use serde::{Deserialize, Serialize};

/// Two D3p hits closer than this in TDC time are treated as noise.
pub const D3P_COINCIDENCE_WINDOW: f64 = 8.0;

/// Clusters of three or more with a smaller mean TDC step are dropped.
pub const BURST_MEAN_DT: f64 = 10.0;

/// Source of the drift-distance thresholds for two-hit clusters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterWidth {
    /// `w_max = 0.9 * 0.5 * (pos[1] - pos[0])` from the wire positions of the
    /// pair, `w_min = w_max / 9 * 4`. Needs a geometry model; without one the
    /// engine uses [`ClusterWidth::CellTable`].
    #[default]
    WirePositions,
    /// Fixed half-cell widths keyed by `detector_id / 5`,
    /// `w_max = 0.9 * hw` and `w_min = 0.4 * hw`.
    CellTable,
}

/// Precedence of the two-hit rules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TwoHitOrder {
    /// The timing rule is only consulted when the drift rule did not fire.
    #[default]
    DriftThenTiming,
    /// The timing rule is consulted first.
    TimingThenDrift,
}

/// Declustering configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeclusterConfig {
    /// Threshold source for two-hit clusters.
    pub cluster_width: ClusterWidth,
    /// Rule precedence for two-hit clusters.
    pub two_hit_order: TwoHitOrder,
    /// What happens when the scan reaches the first non-chamber hit.
    ///
    /// `false` passes the pending cluster and every following hit through
    /// untouched; `true` runs the pending cluster through the rules first.
    pub flush_final_cluster_at_boundary: bool,
}

/// Half cell width of a chamber, looked up by `detector_id / 5`.
///
/// Groups without an entry use the D0 width.
pub fn half_cell_width(detector_id: i32) -> f64 {
    match detector_id / 5 {
        1 => 2.083 / 2.0,
        2 | 3 => 2.021 / 2.0,
        4 | 5 => 2.0 / 2.0,
        _ => 0.635 / 2.0,
    }
}

/// Scan state while walking the sorted working set.
#[derive(Debug, Default)]
enum ScanState {
    #[default]
    NoCluster,
    InCluster(Vec<usize>),
}

/// Declusters adjacent chamber hits.
#[derive(Clone, Debug, Default)]
pub struct DeclusterEngine<'g> {
    config: DeclusterConfig,
    geometry: Option<&'g GeometryModel>,
}

impl<'g> DeclusterEngine<'g> {
    /// Creates an engine.
    ///
    /// `geometry` is only consulted for [`ClusterWidth::WirePositions`].
    pub fn new(config: DeclusterConfig, geometry: Option<&'g GeometryModel>) -> Self {
        if config.cluster_width == ClusterWidth::WirePositions && geometry.is_none() {
            log::debug!("no geometry model; two-hit clusters use the cell width table");
        }
        Self { config, geometry }
    }

    /// Engine configuration.
    pub fn config(&self) -> &DeclusterConfig {
        &self.config
    }

    /// Declusters the working set.
    ///
    /// `indices` is expected in (detector, element) order; it is re-sorted
    /// stably if not. Survivors keep the scan order.
    pub fn decluster(
        &self,
        hits: &EventHits<'_>,
        indices: &[usize],
        stats: &mut ReductionStatistics,
    ) -> Vec<usize> {
        let mut ordered = indices.to_vec();
        if ordered
            .windows(2)
            .any(|w| hits.sort_key(w[0]) > hits.sort_key(w[1]))
        {
            ordered.sort_by_key(|&i| hits.sort_key(i));
        }

        let mut kept = Vec::with_capacity(ordered.len());
        let mut state = ScanState::NoCluster;

        for (pos, &i) in ordered.iter().enumerate() {
            if hits.detector_id(i) > N_CHAMBER_PLANES {
                if let ScanState::InCluster(cluster) = std::mem::take(&mut state) {
                    if self.config.flush_final_cluster_at_boundary {
                        self.flush(hits, &cluster, &mut kept, stats);
                    } else {
                        kept.extend_from_slice(&cluster);
                    }
                }
                kept.extend_from_slice(&ordered[pos..]);
                return kept;
            }

            state = match std::mem::take(&mut state) {
                ScanState::NoCluster => ScanState::InCluster(vec![i]),
                ScanState::InCluster(mut cluster) => {
                    if extends(hits, &cluster, i) {
                        cluster.push(i);
                    } else {
                        self.flush(hits, &cluster, &mut kept, stats);
                        cluster.clear();
                        cluster.push(i);
                    }
                    ScanState::InCluster(cluster)
                }
            };
        }

        if let ScanState::InCluster(cluster) = state {
            self.flush(hits, &cluster, &mut kept, stats);
        }
        kept
    }

    fn flush(
        &self,
        hits: &EventHits<'_>,
        cluster: &[usize],
        kept: &mut Vec<usize>,
        stats: &mut ReductionStatistics,
    ) {
        stats.clusters_found += 1;
        kept.extend(self.process_cluster(hits, cluster, &mut stats.anomalies));
    }

    /// Applies the retention rules to one cluster.
    ///
    /// `cluster` is in element order. A cluster spanning several detectors
    /// is returned unchanged and counted as an anomaly.
    pub fn process_cluster(
        &self,
        hits: &EventHits<'_>,
        cluster: &[usize],
        anomalies: &mut AnomalyCounts,
    ) -> Vec<usize> {
        let (first, last) = match cluster {
            [] => return Vec::new(),
            [only] => return vec![*only],
            [first, .., last] => (*first, *last),
        };

        let detector_id = hits.detector_id(first);
        if cluster.iter().any(|&i| hits.detector_id(i) != detector_id) {
            log::debug!("cluster spans several detectors; passed through");
            anomalies.mixed_detector_cluster += 1;
            return cluster.to_vec();
        }

        if cluster.len() == 2 {
            return self.process_pair(hits, first, last, anomalies);
        }

        if mean_tdc_step(hits, cluster) < BURST_MEAN_DT {
            Vec::new()
        } else {
            vec![first, last]
        }
    }

    fn process_pair(
        &self,
        hits: &EventHits<'_>,
        a: usize,
        b: usize,
        anomalies: &mut AnomalyCounts,
    ) -> Vec<usize> {
        let Some((w_max, w_min)) = self.pair_widths(hits, a, b, anomalies) else {
            return vec![a, b];
        };

        let drift = drift_rule(hits.drift_distance(a), hits.drift_distance(b), w_max, w_min)
            .map(|keep_first| if keep_first { a } else { b });
        let coincident = is_d3p(hits.detector_id(a))
            && (hits.tdc_time(a) - hits.tdc_time(b)).abs() < D3P_COINCIDENCE_WINDOW;

        match (self.config.two_hit_order, drift, coincident) {
            (TwoHitOrder::DriftThenTiming, Some(keep), _) => vec![keep],
            (TwoHitOrder::TimingThenDrift, _, true) | (TwoHitOrder::DriftThenTiming, None, true) => {
                Vec::new()
            }
            (TwoHitOrder::TimingThenDrift, Some(keep), false) => vec![keep],
            (_, None, false) => vec![a, b],
        }
    }

    /// Drift thresholds `(w_max, w_min)` for a pair, `None` when the pair
    /// must pass through.
    fn pair_widths(
        &self,
        hits: &EventHits<'_>,
        a: usize,
        b: usize,
        anomalies: &mut AnomalyCounts,
    ) -> Option<(f64, f64)> {
        let detector_id = hits.detector_id(a);
        let geometry = match (self.config.cluster_width, self.geometry) {
            (ClusterWidth::WirePositions, Some(geometry)) => geometry,
            _ => {
                let hw = half_cell_width(detector_id);
                return Some((0.9 * hw, 0.4 * hw));
            }
        };

        let Some(plane) = geometry.plane(detector_id) else {
            log::debug!("detector {detector_id} missing from geometry; pair passed through");
            anomalies.missing_geometry += 1;
            return None;
        };
        let (e0, e1) = (hits.element_id(a), hits.element_id(b));
        if !plane.contains_element(e0) || !plane.contains_element(e1) {
            anomalies.element_out_of_range += 1;
            return None;
        }

        let w_max = 0.9 * 0.5 * (plane.wire_position(e1) - plane.wire_position(e0)).abs();
        Some((w_max, w_max / 9.0 * 4.0))
    }
}

impl HitFilter for DeclusterEngine<'_> {
    fn apply(
        &self,
        hits: &EventHits<'_>,
        indices: &[usize],
        stats: &mut ReductionStatistics,
    ) -> Vec<usize> {
        self.decluster(hits, indices, stats)
    }

    fn stage(&self) -> Stage {
        Stage::Decluster
    }
}

fn extends(hits: &EventHits<'_>, cluster: &[usize], i: usize) -> bool {
    cluster.last().is_some_and(|&last| {
        hits.detector_id(i) == hits.detector_id(last)
            && (hits.element_id(i) - hits.element_id(last)).abs() <= 1
    })
}

#[inline]
fn is_d3p(detector_id: i32) -> bool {
    (19..=24).contains(&detector_id)
}

/// Drift rule for a pair. `Some(true)` keeps the first hit, `Some(false)`
/// the second, `None` when the rule does not fire.
fn drift_rule(d0: f64, d1: f64, w_max: f64, w_min: f64) -> Option<bool> {
    let fires = (d0 > w_max && d1 > w_min) || (d0 > w_min && d1 > w_max);
    fires.then_some(d0 <= d1)
}

/// Mean absolute TDC difference between consecutive cluster members.
#[allow(clippy::cast_precision_loss)]
fn mean_tdc_step(hits: &EventHits<'_>, cluster: &[usize]) -> f64 {
    let total: f64 = cluster
        .windows(2)
        .map(|pair| (hits.tdc_time(pair[1]) - hits.tdc_time(pair[0])).abs())
        .sum();
    total / (cluster.len() - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use hitreduce_geom::PlaneParams;

    struct Event {
        det: Vec<i32>,
        elem: Vec<i32>,
        drift: Vec<f64>,
        tdc: Vec<f64>,
    }

    impl Event {
        fn hits(&self) -> EventHits<'_> {
            EventHits::new(&self.det, &self.elem, &self.drift, &self.tdc).unwrap()
        }
    }

    fn pair(det: i32, drift: [f64; 2], tdc: [f64; 2]) -> Event {
        Event {
            det: vec![det, det],
            elem: vec![10, 11],
            drift: drift.to_vec(),
            tdc: tdc.to_vec(),
        }
    }

    fn run(engine: &DeclusterEngine<'_>, event: &Event) -> (Vec<usize>, ReductionStatistics) {
        let hits = event.hits();
        let mut stats = ReductionStatistics::default();
        let kept = engine.decluster(&hits, &hits.sorted_indices(), &mut stats);
        (kept, stats)
    }

    fn table_engine() -> DeclusterEngine<'static> {
        DeclusterEngine::new(
            DeclusterConfig {
                cluster_width: ClusterWidth::CellTable,
                ..Default::default()
            },
            None,
        )
    }

    #[test]
    fn test_half_cell_width_table() {
        assert!((half_cell_width(3) - 0.3175).abs() < 1e-12);
        assert!((half_cell_width(7) - 1.0415).abs() < 1e-12);
        assert!((half_cell_width(15) - 1.0105).abs() < 1e-12);
        assert!((half_cell_width(22) - 1.0).abs() < 1e-12);
        // 30 / 5 = 6 has no entry.
        assert!((half_cell_width(30) - 0.3175).abs() < 1e-12);
    }

    #[test]
    fn test_singletons_always_kept() {
        let event = Event {
            det: vec![3, 3, 9, 20],
            elem: vec![10, 12, 10, 10],
            drift: vec![5.0, 5.0, 5.0, 5.0],
            tdc: vec![0.0; 4],
        };
        let (kept, stats) = run(&table_engine(), &event);
        assert_eq!(kept, vec![0, 1, 2, 3]);
        assert_eq!(stats.clusters_found, 4);
    }

    #[test]
    fn test_pair_drift_rule_keeps_smaller_drift() {
        // D0 cell: w_max = 0.2858, w_min = 0.127.
        let (kept, _) = run(&table_engine(), &pair(3, [0.4, 0.2], [0.0, 100.0]));
        assert_eq!(kept, vec![1]);
        let (kept, _) = run(&table_engine(), &pair(3, [0.2, 0.4], [0.0, 100.0]));
        assert_eq!(kept, vec![0]);
    }

    #[test]
    fn test_pair_drift_tie_keeps_first() {
        let (kept, _) = run(&table_engine(), &pair(3, [0.3, 0.3], [0.0, 100.0]));
        assert_eq!(kept, vec![0]);
    }

    #[test]
    fn test_pair_small_drift_keeps_both() {
        // Only one hit above w_min: the rule needs both.
        let (kept, _) = run(&table_engine(), &pair(3, [0.03, 1.5], [0.0, 100.0]));
        assert_eq!(kept, vec![0, 1]);
    }

    #[test]
    fn test_d3p_coincidence_drops_both() {
        let (kept, stats) = run(&table_engine(), &pair(20, [0.1, 0.1], [1000.0, 1005.0]));
        assert!(kept.is_empty());
        assert_eq!(stats.clusters_found, 1);

        // Same timing outside D3p is kept.
        let (kept, _) = run(&table_engine(), &pair(26, [0.1, 0.1], [1000.0, 1005.0]));
        assert_eq!(kept, vec![0, 1]);

        // Far enough apart in time.
        let (kept, _) = run(&table_engine(), &pair(20, [0.1, 0.1], [1000.0, 1008.0]));
        assert_eq!(kept, vec![0, 1]);
    }

    #[test]
    fn test_two_hit_order() {
        // D3p pair where both rules fire.
        let event = pair(20, [0.95, 0.5], [1000.0, 1001.0]);

        let (kept, _) = run(&table_engine(), &event);
        assert_eq!(kept, vec![1]);

        let timing_first = DeclusterEngine::new(
            DeclusterConfig {
                cluster_width: ClusterWidth::CellTable,
                two_hit_order: TwoHitOrder::TimingThenDrift,
                ..Default::default()
            },
            None,
        );
        let (kept, _) = run(&timing_first, &event);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_three_hit_burst_dropped() {
        let event = Event {
            det: vec![14, 14, 14],
            elem: vec![30, 31, 32],
            drift: vec![0.5; 3],
            tdc: vec![1000.0, 1005.0, 1010.0],
        };
        let (kept, _) = run(&table_engine(), &event);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_three_hit_keeps_edges() {
        let event = Event {
            det: vec![14, 14, 14],
            elem: vec![30, 31, 32],
            drift: vec![0.5; 3],
            tdc: vec![1000.0, 1200.0, 1400.0],
        };
        let (kept, _) = run(&table_engine(), &event);
        assert_eq!(kept, vec![0, 2]);
    }

    #[test]
    fn test_mean_step_uses_element_order() {
        // Sorted by tdc the steps would be 1 and 1; in element order they
        // are 20 and 19.
        let event = Event {
            det: vec![14, 14, 14],
            elem: vec![30, 31, 32],
            drift: vec![0.5; 3],
            tdc: vec![1000.0, 1020.0, 1001.0],
        };
        let (kept, _) = run(&table_engine(), &event);
        assert_eq!(kept, vec![0, 2]);
    }

    #[test]
    fn test_gap_splits_clusters() {
        let event = Event {
            det: vec![14, 14, 14, 14],
            elem: vec![30, 31, 33, 34],
            drift: vec![0.1; 4],
            tdc: vec![0.0, 100.0, 200.0, 300.0],
        };
        let (kept, stats) = run(&table_engine(), &event);
        assert_eq!(kept, vec![0, 1, 2, 3]);
        assert_eq!(stats.clusters_found, 2);
    }

    #[test]
    fn test_unsorted_input_is_ordered_first() {
        let event = Event {
            det: vec![14, 14, 14],
            elem: vec![32, 30, 31],
            drift: vec![0.5; 3],
            tdc: vec![1400.0, 1000.0, 1200.0],
        };
        let hits = event.hits();
        let mut stats = ReductionStatistics::default();
        let kept = table_engine().decluster(&hits, &[0, 1, 2], &mut stats);
        assert_eq!(kept, vec![1, 0]);
    }

    #[test]
    fn test_mixed_detector_cluster_passes_through() {
        let event = Event {
            det: vec![3, 4, 3],
            elem: vec![1, 2, 3],
            drift: vec![0.0; 3],
            tdc: vec![0.0; 3],
        };
        let hits = event.hits();
        let mut anomalies = AnomalyCounts::default();
        let kept = table_engine().process_cluster(&hits, &[0, 1, 2], &mut anomalies);
        assert_eq!(kept, vec![0, 1, 2]);
        assert_eq!(anomalies.mixed_detector_cluster, 1);
    }

    fn boundary_event() -> Event {
        // A D3p pair right before the first hodoscope hit.
        Event {
            det: vec![20, 20, 33, 33],
            elem: vec![5, 6, 1, 2],
            drift: vec![0.1; 4],
            tdc: vec![1000.0, 1001.0, 0.0, 0.0],
        }
    }

    #[test]
    fn test_boundary_passes_pending_cluster() {
        let (kept, stats) = run(&table_engine(), &boundary_event());
        assert_eq!(kept, vec![0, 1, 2, 3]);
        assert_eq!(stats.clusters_found, 0);
    }

    #[test]
    fn test_boundary_flushes_pending_cluster() {
        let engine = DeclusterEngine::new(
            DeclusterConfig {
                cluster_width: ClusterWidth::CellTable,
                flush_final_cluster_at_boundary: true,
                ..Default::default()
            },
            None,
        );
        let (kept, stats) = run(&engine, &boundary_event());
        assert_eq!(kept, vec![2, 3]);
        assert_eq!(stats.clusters_found, 1);
    }

    #[test]
    fn test_wire_position_widths() {
        // Spacing 1.0: w_max = 0.45, w_min = 0.2.
        let geometry =
            GeometryModel::from_params([PlaneParams::new("D0X", 20, 1.0, 600.0)]).unwrap();
        let engine = DeclusterEngine::new(DeclusterConfig::default(), Some(&geometry));

        let (kept, _) = run(&engine, &pair(1, [0.5, 0.25], [0.0, 100.0]));
        assert_eq!(kept, vec![1]);
        // 0.3 and 0.19 trip the D0 table thresholds but not the wire ones.
        let (kept, _) = run(&engine, &pair(1, [0.3, 0.19], [0.0, 100.0]));
        assert_eq!(kept, vec![0, 1]);
        let (kept, _) = run(&table_engine(), &pair(1, [0.3, 0.19], [0.0, 100.0]));
        assert_eq!(kept, vec![1]);
    }

    #[test]
    fn test_wire_position_missing_plane_passes_through() {
        let geometry =
            GeometryModel::from_params([PlaneParams::new("D0X", 20, 1.0, 600.0)]).unwrap();
        let engine = DeclusterEngine::new(DeclusterConfig::default(), Some(&geometry));

        let (kept, stats) = run(&engine, &pair(2, [0.5, 0.25], [0.0, 100.0]));
        assert_eq!(kept, vec![0, 1]);
        assert_eq!(stats.anomalies.missing_geometry, 1);

        let event = Event {
            det: vec![1, 1],
            elem: vec![20, 21],
            drift: vec![0.5, 0.25],
            tdc: vec![0.0, 100.0],
        };
        let (kept, stats) = run(&engine, &event);
        assert_eq!(kept, vec![0, 1]);
        assert_eq!(stats.anomalies.element_out_of_range, 1);
    }
}
