//! Out-of-time hit removal.

use crate::filter::{HitFilter, Stage};
use hitreduce_core::{EventHits, ReductionStatistics};
use serde::{Deserialize, Serialize};

/// Symmetric TDC acceptance window, bounds inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Window center.
    pub center: f64,
    /// Full window width.
    pub width: f64,
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self {
            center: 950.0,
            width: 7.4,
        }
    }
}

impl TimeWindow {
    /// Creates a window.
    pub fn new(center: f64, width: f64) -> Self {
        Self { center, width }
    }

    /// Lower bound.
    #[inline]
    pub fn lower(&self) -> f64 {
        self.center - 0.5 * self.width
    }

    /// Upper bound.
    #[inline]
    pub fn upper(&self) -> f64 {
        self.center + 0.5 * self.width
    }

    /// Returns true if `tdc_time` lies within the window.
    #[inline]
    pub fn contains(&self, tdc_time: f64) -> bool {
        self.lower() <= tdc_time && tdc_time <= self.upper()
    }
}

/// Open TDC interval `(lower, upper)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TdcRange {
    pub lower: f64,
    pub upper: f64,
}

impl TdcRange {
    /// Creates a range.
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Returns true if `tdc_time` lies strictly inside the range.
    #[inline]
    pub fn contains(&self, tdc_time: f64) -> bool {
        self.lower < tdc_time && tdc_time < self.upper
    }
}

/// Per-station timing windows of the recorded data.
///
/// Hodoscope planes are always in time. Station 1 chambers and unknown
/// detector ids have no window and are always out of time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationWindows {
    /// Detector ids 1-6.
    pub d0: TdcRange,
    /// Detector ids 13-18.
    pub d2: TdcRange,
    /// Detector ids 19-24.
    pub d3p: TdcRange,
    /// Detector ids 25-30.
    pub d3m: TdcRange,
    /// Proportional tubes, detector ids 47-54.
    pub prop_tubes: TdcRange,
}

impl Default for StationWindows {
    fn default() -> Self {
        Self {
            d0: TdcRange::new(1700.0, 1820.0),
            d2: TdcRange::new(1450.0, 1710.0),
            d3p: TdcRange::new(1360.0, 1580.0),
            d3m: TdcRange::new(1490.0, 1700.0),
            prop_tubes: TdcRange::new(560.0, 1200.0),
        }
    }
}

impl StationWindows {
    /// Returns true if a hit on `detector_id` at `tdc_time` is in time.
    pub fn in_time(&self, detector_id: i32, tdc_time: f64) -> bool {
        let range = match detector_id {
            1..=6 => self.d0,
            13..=18 => self.d2,
            19..=24 => self.d3p,
            25..=30 => self.d3m,
            31..=46 => return true,
            47..=54 => self.prop_tubes,
            _ => return false,
        };
        range.contains(tdc_time)
    }
}

/// Which timing cut the out-of-time stage applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfTimePolicy {
    /// One [`TimeWindow`] for every hit.
    #[default]
    Uniform,
    /// [`StationWindows`] keyed by detector id.
    PerStation,
}

/// Removes hits whose TDC time is outside the acceptance window.
#[derive(Clone, Debug, Default)]
pub struct OutOfTimeFilter {
    window: TimeWindow,
    policy: OutOfTimePolicy,
    stations: StationWindows,
}

impl OutOfTimeFilter {
    /// Uniform window filter.
    pub fn new(window: TimeWindow) -> Self {
        Self {
            window,
            policy: OutOfTimePolicy::Uniform,
            stations: StationWindows::default(),
        }
    }

    /// Per-station window filter.
    pub fn per_station(stations: StationWindows) -> Self {
        Self {
            window: TimeWindow::default(),
            policy: OutOfTimePolicy::PerStation,
            stations,
        }
    }

    /// Returns true if hit `i` passes the cut.
    #[inline]
    pub fn in_time(&self, hits: &EventHits<'_>, i: usize) -> bool {
        match self.policy {
            OutOfTimePolicy::Uniform => self.window.contains(hits.tdc_time(i)),
            OutOfTimePolicy::PerStation => {
                self.stations.in_time(hits.detector_id(i), hits.tdc_time(i))
            }
        }
    }
}

impl HitFilter for OutOfTimeFilter {
    fn apply(
        &self,
        hits: &EventHits<'_>,
        indices: &[usize],
        _stats: &mut ReductionStatistics,
    ) -> Vec<usize> {
        indices
            .iter()
            .copied()
            .filter(|&i| self.in_time(hits, i))
            .collect()
    }

    fn stage(&self) -> Stage {
        Stage::OutOfTime
    }
}
