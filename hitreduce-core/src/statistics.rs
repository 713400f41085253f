//! Per-event and per-run reduction statistics.

use crate::detector::Station;
use std::ops::AddAssign;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Countable anomalies encountered while filtering.
///
/// None of these abort processing; the offending hit or group is excluded
/// or passed through and the occurrence is counted here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnomalyCounts {
    /// Hits whose detector id is absent from the geometry model.
    pub missing_geometry: usize,
    /// Hits on planes whose type could not be classified.
    pub unknown_plane_type: usize,
    /// Clusters spanning more than one detector id.
    pub mixed_detector_cluster: usize,
    /// Hits whose element id lies outside the plane.
    pub element_out_of_range: usize,
}

impl AnomalyCounts {
    /// Total number of anomalies.
    pub fn total(&self) -> usize {
        self.missing_geometry
            + self.unknown_plane_type
            + self.mixed_detector_cluster
            + self.element_out_of_range
    }

    /// Returns true if nothing was counted.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl AddAssign for AnomalyCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.missing_geometry += rhs.missing_geometry;
        self.unknown_plane_type += rhs.unknown_plane_type;
        self.mixed_detector_cluster += rhs.mixed_detector_cluster;
        self.element_out_of_range += rhs.element_out_of_range;
    }
}

/// Number of hits removed by each stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StageCounts {
    /// Removed as duplicates.
    pub dedup: usize,
    /// Removed as out of time.
    pub out_of_time: usize,
    /// Removed by declustering.
    pub decluster: usize,
    /// Removed by the hodoscope mask.
    pub hodo_mask: usize,
    /// Removed by the sagitta filter.
    pub sagitta: usize,
}

impl StageCounts {
    /// Total hits removed across stages.
    pub fn total(&self) -> usize {
        self.dedup + self.out_of_time + self.decluster + self.hodo_mask + self.sagitta
    }
}

impl AddAssign for StageCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.dedup += rhs.dedup;
        self.out_of_time += rhs.out_of_time;
        self.decluster += rhs.decluster;
        self.hodo_mask += rhs.hodo_mask;
        self.sagitta += rhs.sagitta;
    }
}

/// Hit counts before and after reduction, split by station.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StationCounts {
    /// Hits entering the pipeline, indexed by [`Station::index`].
    pub hits_in: [usize; 7],
    /// Hits surviving the pipeline, indexed by [`Station::index`].
    pub hits_kept: [usize; 7],
}

impl StationCounts {
    /// Counts an incoming hit.
    #[inline]
    pub fn record_in(&mut self, detector_id: i32) {
        self.hits_in[Station::of(detector_id).index()] += 1;
    }

    /// Counts a surviving hit.
    #[inline]
    pub fn record_kept(&mut self, detector_id: i32) {
        self.hits_kept[Station::of(detector_id).index()] += 1;
    }

    /// Incoming hits of one station.
    pub fn hits_in(&self, station: Station) -> usize {
        self.hits_in[station.index()]
    }

    /// Surviving hits of one station.
    pub fn hits_kept(&self, station: Station) -> usize {
        self.hits_kept[station.index()]
    }

    /// Fraction of a station's hits that survived, `None` without input.
    #[allow(clippy::cast_precision_loss)]
    pub fn retention(&self, station: Station) -> Option<f64> {
        let n_in = self.hits_in(station);
        (n_in > 0).then(|| self.hits_kept(station) as f64 / n_in as f64)
    }
}

impl AddAssign for StationCounts {
    fn add_assign(&mut self, rhs: Self) {
        for i in 0..self.hits_in.len() {
            self.hits_in[i] += rhs.hits_in[i];
            self.hits_kept[i] += rhs.hits_kept[i];
        }
    }
}

/// Statistics for the reduction of one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReductionStatistics {
    /// Hits in the raw event.
    pub hits_in: usize,
    /// Hits in the reduced event.
    pub hits_kept: usize,
    /// Per-stage removals.
    pub removed: StageCounts,
    /// Clusters formed by the decluster stage.
    pub clusters_found: usize,
    /// Anomalies encountered.
    pub anomalies: AnomalyCounts,
    /// Per-station breakdown.
    pub stations: StationCounts,
}

/// Statistics accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunStatistics {
    /// Events handed to the reducer.
    pub events_processed: usize,
    /// Events rejected by the occupancy cut.
    pub events_rejected: usize,
    /// Hits in all events.
    pub hits_in: usize,
    /// Hits kept in all events.
    pub hits_kept: usize,
    /// Per-stage removals.
    pub removed: StageCounts,
    /// Clusters formed.
    pub clusters_found: usize,
    /// Anomalies encountered.
    pub anomalies: AnomalyCounts,
    /// Per-station breakdown.
    pub stations: StationCounts,
}

impl RunStatistics {
    /// Creates empty run statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the statistics of one event.
    pub fn record(&mut self, event: &ReductionStatistics, accepted: bool) {
        self.events_processed += 1;
        if !accepted {
            self.events_rejected += 1;
        }
        self.hits_in += event.hits_in;
        self.hits_kept += event.hits_kept;
        self.removed += event.removed;
        self.clusters_found += event.clusters_found;
        self.anomalies += event.anomalies;
        self.stations += event.stations;
    }

    /// Merges statistics gathered by another worker.
    pub fn merge(&mut self, other: &RunStatistics) {
        self.events_processed += other.events_processed;
        self.events_rejected += other.events_rejected;
        self.hits_in += other.hits_in;
        self.hits_kept += other.hits_kept;
        self.removed += other.removed;
        self.clusters_found += other.clusters_found;
        self.anomalies += other.anomalies;
        self.stations += other.stations;
    }

    /// Fraction of all hits that survived, `None` for an empty run.
    #[allow(clippy::cast_precision_loss)]
    pub fn retention(&self) -> Option<f64> {
        (self.hits_in > 0).then(|| self.hits_kept as f64 / self.hits_in as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_anomaly_totals() {
        let mut a = AnomalyCounts {
            missing_geometry: 2,
            ..Default::default()
        };
        assert!(!a.is_empty());
        a += AnomalyCounts {
            mixed_detector_cluster: 1,
            element_out_of_range: 3,
            ..Default::default()
        };
        assert_eq!(a.total(), 6);
    }

    #[test]
    fn test_run_statistics_record() {
        let mut event = ReductionStatistics {
            hits_in: 10,
            hits_kept: 4,
            removed: StageCounts {
                dedup: 1,
                decluster: 5,
                ..Default::default()
            },
            clusters_found: 3,
            ..Default::default()
        };
        event.stations.record_in(3);
        event.stations.record_kept(3);
        event.stations.record_in(20);

        let mut run = RunStatistics::new();
        run.record(&event, true);
        run.record(&ReductionStatistics::default(), false);

        assert_eq!(run.events_processed, 2);
        assert_eq!(run.events_rejected, 1);
        assert_eq!(run.removed.total(), 6);
        assert_eq!(run.stations.hits_in(Station::D0), 1);
        assert_eq!(run.stations.hits_in(Station::D3p), 1);
        assert_relative_eq!(run.retention().unwrap(), 0.4);
        assert_relative_eq!(run.stations.retention(Station::D0).unwrap(), 1.0);
        assert!(run.stations.retention(Station::D2).is_none());
    }

    #[test]
    fn test_run_statistics_merge() {
        let mut a = RunStatistics {
            events_processed: 3,
            hits_in: 30,
            hits_kept: 12,
            ..Default::default()
        };
        let b = RunStatistics {
            events_processed: 2,
            events_rejected: 1,
            hits_in: 20,
            hits_kept: 8,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.events_processed, 5);
        assert_eq!(a.events_rejected, 1);
        assert_eq!(a.hits_in, 50);
        assert_eq!(a.hits_kept, 20);
    }
}
