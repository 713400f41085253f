//! Whole-event occupancy cut.

use hitreduce_core::{EventHits, Station};
use serde::{Deserialize, Serialize};

/// Largest accepted number of chamber hits per station.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OccupancyLimits {
    pub d0: usize,
    pub d1: usize,
    pub d2: usize,
    pub d3p: usize,
    pub d3m: usize,
}

impl Default for OccupancyLimits {
    fn default() -> Self {
        Self::uniform(40)
    }
}

impl OccupancyLimits {
    /// Same limit for every chamber station.
    pub fn uniform(limit: usize) -> Self {
        Self {
            d0: limit,
            d1: limit,
            d2: limit,
            d3p: limit,
            d3m: limit,
        }
    }

    /// Limit of a station, `None` for non-chamber stations.
    pub fn limit(&self, station: Station) -> Option<usize> {
        match station {
            Station::D0 => Some(self.d0),
            Station::D1 => Some(self.d1),
            Station::D2 => Some(self.d2),
            Station::D3p => Some(self.d3p),
            Station::D3m => Some(self.d3m),
            Station::Hodoscope | Station::Other => None,
        }
    }
}

/// Returns false if any chamber station has more hits than its limit.
pub fn accept_event(hits: &EventHits<'_>, limits: &OccupancyLimits) -> bool {
    let mut counts = [0usize; Station::ALL.len()];
    for &detector_id in hits.detector_ids() {
        counts[Station::of(detector_id).index()] += 1;
    }
    Station::CHAMBERS.iter().all(|&station| {
        limits
            .limit(station)
            .is_none_or(|limit| counts[station.index()] <= limit)
    })
}
