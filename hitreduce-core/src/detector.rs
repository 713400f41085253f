//! Detector id layout of the spectrometer.
//!
//! Detector ids 1-30 are drift-chamber planes, 31-46 are hodoscope and
//! trigger planes, and everything above is a proportional-tube or
//! dark-photon plane.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Highest detector id that belongs to a drift chamber.
pub const N_CHAMBER_PLANES: i32 = 30;

/// Highest detector id that belongs to a hodoscope or trigger plane.
pub const LAST_HODO_PLANE: i32 = 46;

/// Multiplier used to fold (detector, element) into a single id.
pub const UID_DETECTOR_STRIDE: i32 = 1000;

/// Returns true for drift-chamber detector ids.
#[inline]
pub fn is_chamber(detector_id: i32) -> bool {
    (1..=N_CHAMBER_PLANES).contains(&detector_id)
}

/// Returns true for hodoscope and trigger plane detector ids.
#[inline]
pub fn is_hodoscope(detector_id: i32) -> bool {
    (N_CHAMBER_PLANES + 1..=LAST_HODO_PLANE).contains(&detector_id)
}

/// Composite `detector_id * 1000 + element_id` key for one wire or paddle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UniqueId(pub i32);

impl UniqueId {
    /// Creates the unique id of an element.
    #[inline]
    pub fn new(detector_id: i32, element_id: i32) -> Self {
        Self(detector_id * UID_DETECTOR_STRIDE + element_id)
    }

    /// Returns the raw integer value.
    #[inline]
    pub fn as_i32(&self) -> i32 {
        self.0
    }

    /// Detector part of the id.
    #[inline]
    pub fn detector_id(&self) -> i32 {
        self.0.div_euclid(UID_DETECTOR_STRIDE)
    }

    /// Element part of the id.
    #[inline]
    pub fn element_id(&self) -> i32 {
        self.0.rem_euclid(UID_DETECTOR_STRIDE)
    }
}

impl std::fmt::Display for UniqueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chamber station groups used by the occupancy cut and run statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Station {
    /// Station 0 chambers, detector ids 1-6.
    D0,
    /// Station 1 chambers, detector ids 7-12.
    D1,
    /// Station 2 chambers, detector ids 13-18.
    D2,
    /// Station 3 upper chambers, detector ids 19-24.
    D3p,
    /// Station 3 lower chambers, detector ids 25-30.
    D3m,
    /// Hodoscope and trigger planes, detector ids 31-46.
    Hodoscope,
    /// Proportional tubes and everything else.
    Other,
}

impl Station {
    /// All stations in detector id order.
    pub const ALL: [Station; 7] = [
        Station::D0,
        Station::D1,
        Station::D2,
        Station::D3p,
        Station::D3m,
        Station::Hodoscope,
        Station::Other,
    ];

    /// The five drift-chamber stations.
    pub const CHAMBERS: [Station; 5] = [
        Station::D0,
        Station::D1,
        Station::D2,
        Station::D3p,
        Station::D3m,
    ];

    /// Classifies a detector id.
    pub fn of(detector_id: i32) -> Self {
        match detector_id {
            1..=6 => Station::D0,
            7..=12 => Station::D1,
            13..=18 => Station::D2,
            19..=24 => Station::D3p,
            25..=30 => Station::D3m,
            31..=46 => Station::Hodoscope,
            _ => Station::Other,
        }
    }

    /// Position of the station in [`Station::ALL`].
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short display name.
    pub fn name(self) -> &'static str {
        match self {
            Station::D0 => "D0",
            Station::D1 => "D1",
            Station::D2 => "D2",
            Station::D3p => "D3p",
            Station::D3m => "D3m",
            Station::Hodoscope => "Hodo",
            Station::Other => "Other",
        }
    }
}

/// Track-finding station used by the sagitta filter.
///
/// Station 1 is D0/D1, station 2 is D2 and station 3 is D3p/D3m.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingStation {
    /// Detector ids up to 12.
    First,
    /// Detector ids 13-18.
    Second,
    /// Detector ids 19-30.
    Third,
}

impl TrackingStation {
    /// Classifies a chamber detector id, `None` for anything outside 1-30.
    pub fn of(detector_id: i32) -> Option<Self> {
        match detector_id {
            1..=12 => Some(TrackingStation::First),
            13..=18 => Some(TrackingStation::Second),
            19..=30 => Some(TrackingStation::Third),
            _ => None,
        }
    }
}
