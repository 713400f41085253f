//! Hit types for per-event detector data.

use crate::detector::UniqueId;
use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Values of a single hit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitData {
    /// Physical plane the hit was recorded on.
    pub detector_id: i32,
    /// Wire or paddle index within the plane (1-based).
    pub element_id: i32,
    /// Signed distance from the wire.
    pub drift_distance: f64,
    /// Digitized timing value.
    pub tdc_time: f64,
}

impl HitData {
    /// Creates a new hit.
    #[inline]
    pub fn new(detector_id: i32, element_id: i32, drift_distance: f64, tdc_time: f64) -> Self {
        Self {
            detector_id,
            element_id,
            drift_distance,
            tdc_time,
        }
    }

    /// Unique id of the element this hit was recorded on.
    #[inline]
    pub fn uid(&self) -> UniqueId {
        UniqueId::new(self.detector_id, self.element_id)
    }
}

/// Read-only view over the four parallel hit columns of one event.
///
/// Every filter stage borrows the event through this type and works on
/// index sets into it; hit values are never copied or modified.
#[derive(Debug, Clone, Copy)]
pub struct EventHits<'a> {
    detector_id: &'a [i32],
    element_id: &'a [i32],
    drift_distance: &'a [f64],
    tdc_time: &'a [f64],
}

impl<'a> EventHits<'a> {
    /// Wraps the hit columns of an event.
    ///
    /// Fails with [`Error::LengthMismatch`] unless all columns have the same
    /// length.
    pub fn new(
        detector_id: &'a [i32],
        element_id: &'a [i32],
        drift_distance: &'a [f64],
        tdc_time: &'a [f64],
    ) -> Result<Self> {
        let n = detector_id.len();
        if element_id.len() != n || drift_distance.len() != n || tdc_time.len() != n {
            return Err(Error::LengthMismatch {
                detector_id: n,
                element_id: element_id.len(),
                drift_distance: drift_distance.len(),
                tdc_time: tdc_time.len(),
            });
        }
        Ok(Self {
            detector_id,
            element_id,
            drift_distance,
            tdc_time,
        })
    }

    /// Number of hits in the event.
    #[inline]
    pub fn len(&self) -> usize {
        self.detector_id.len()
    }

    /// Returns true if the event has no hits.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.detector_id.is_empty()
    }

    /// Detector id of hit `i`.
    #[inline]
    pub fn detector_id(&self, i: usize) -> i32 {
        self.detector_id[i]
    }

    /// Element id of hit `i`.
    #[inline]
    pub fn element_id(&self, i: usize) -> i32 {
        self.element_id[i]
    }

    /// Drift distance of hit `i`.
    #[inline]
    pub fn drift_distance(&self, i: usize) -> f64 {
        self.drift_distance[i]
    }

    /// TDC time of hit `i`.
    #[inline]
    pub fn tdc_time(&self, i: usize) -> f64 {
        self.tdc_time[i]
    }

    /// Unique id of hit `i`.
    #[inline]
    pub fn uid(&self, i: usize) -> UniqueId {
        UniqueId::new(self.detector_id[i], self.element_id[i])
    }

    /// Sort key used to order the working set.
    #[inline]
    pub fn sort_key(&self, i: usize) -> (i32, i32) {
        (self.detector_id[i], self.element_id[i])
    }

    /// Detector id column.
    #[inline]
    pub fn detector_ids(&self) -> &'a [i32] {
        self.detector_id
    }

    /// Identity working set `0..len`.
    pub fn all_indices(&self) -> Vec<usize> {
        (0..self.len()).collect()
    }

    /// Working set sorted by (detector id, element id).
    ///
    /// The sort is stable, so hits sharing a key keep their input order.
    pub fn sorted_indices(&self) -> Vec<usize> {
        let mut indices = self.all_indices();
        indices.sort_by_key(|&i| self.sort_key(i));
        indices
    }

    /// Checks that every index in `indices` points into this event.
    pub fn check_indices(&self, indices: &[usize]) -> Result<()> {
        match indices.iter().find(|&&i| i >= self.len()) {
            Some(&index) => Err(Error::IndexOutOfRange {
                index,
                len: self.len(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_data() {
        let hit = HitData::new(20, 11, 0.25, 1250.0);
        assert_eq!(hit.uid(), UniqueId(20_011));
        assert!((hit.drift_distance - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_event_hits_length_mismatch() {
        let det = [1, 2, 3];
        let elem = [1, 2];
        let drift = [0.0; 3];
        let tdc = [0.0; 3];
        let err = EventHits::new(&det, &elem, &drift, &tdc).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { element_id: 2, .. }));
    }

    #[test]
    fn test_sorted_indices_is_stable() {
        let det = [5, 3, 5, 3];
        let elem = [2, 7, 2, 1];
        let drift = [0.0; 4];
        let tdc = [0.0; 4];
        let event = EventHits::new(&det, &elem, &drift, &tdc).unwrap();
        assert_eq!(event.sorted_indices(), vec![3, 1, 0, 2]);
    }

    #[test]
    fn test_check_indices() {
        let det = [1, 2];
        let elem = [1, 1];
        let drift = [0.0; 2];
        let tdc = [0.0; 2];
        let event = EventHits::new(&det, &elem, &drift, &tdc).unwrap();
        assert!(event.check_indices(&[0, 1]).is_ok());
        assert!(matches!(
            event.check_indices(&[0, 2]),
            Err(Error::IndexOutOfRange { index: 2, len: 2 })
        ));
    }
}
