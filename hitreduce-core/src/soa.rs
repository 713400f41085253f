//! Structure of Arrays (`SoA`) storage for the hits of one event.
//!
//! `HitColumns` owns the four parallel columns an upstream reader hands
//! over per event. Filters never see it directly; they borrow it as an
//! [`EventHits`] view.

use crate::error::Result;
use crate::hit::{EventHits, HitData};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Owned hit columns of one event.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitColumns {
    /// Columnar storage for detector ids.
    pub detector_id: Vec<i32>,
    /// Columnar storage for element ids.
    pub element_id: Vec<i32>,
    /// Columnar storage for drift distances.
    pub drift_distance: Vec<f64>,
    /// Columnar storage for TDC times.
    pub tdc_time: Vec<f64>,
}

impl HitColumns {
    /// Creates a new empty set of columns with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            detector_id: Vec::with_capacity(capacity),
            element_id: Vec::with_capacity(capacity),
            drift_distance: Vec::with_capacity(capacity),
            tdc_time: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.detector_id.len()
    }

    /// Returns true if there are no hits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.detector_id.is_empty()
    }

    /// Clears all columns.
    pub fn clear(&mut self) {
        self.detector_id.clear();
        self.element_id.clear();
        self.drift_distance.clear();
        self.tdc_time.clear();
    }

    /// Pushes a single hit.
    pub fn push(&mut self, detector_id: i32, element_id: i32, drift_distance: f64, tdc_time: f64) {
        self.detector_id.push(detector_id);
        self.element_id.push(element_id);
        self.drift_distance.push(drift_distance);
        self.tdc_time.push(tdc_time);
    }

    /// Pushes a single hit from its values.
    pub fn push_hit(&mut self, hit: HitData) {
        self.push(
            hit.detector_id,
            hit.element_id,
            hit.drift_distance,
            hit.tdc_time,
        );
    }

    /// Borrows the columns as a read-only event view.
    ///
    /// Fails if the public columns were edited to different lengths.
    pub fn as_event(&self) -> Result<EventHits<'_>> {
        EventHits::new(
            &self.detector_id,
            &self.element_id,
            &self.drift_distance,
            &self.tdc_time,
        )
    }

    /// Copies the hits at `indices`, in the given order, into new columns.
    ///
    /// # Panics
    /// Panics if an index is out of range.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Self {
        let mut out = Self::with_capacity(indices.len());
        for &i in indices {
            out.push(
                self.detector_id[i],
                self.element_id[i],
                self.drift_distance[i],
                self.tdc_time[i],
            );
        }
        out
    }
}

impl FromIterator<HitData> for HitColumns {
    fn from_iter<I: IntoIterator<Item = HitData>>(iter: I) -> Self {
        let mut columns = HitColumns::default();
        for hit in iter {
            columns.push_hit(hit);
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_columns_operations() {
        let mut columns = HitColumns::with_capacity(10);
        assert!(columns.is_empty());

        columns.push(3, 40, 0.12, 1510.0);
        assert_eq!(columns.len(), 1);
        assert_eq!(columns.detector_id[0], 3);

        columns.push(3, 41, 0.30, 1522.0);
        assert_eq!(columns.len(), 2);

        let event = columns.as_event().unwrap();
        assert_eq!(event.element_id(1), 41);

        columns.clear();
        assert!(columns.is_empty());
    }

    #[test]
    fn test_select_keeps_requested_order() {
        let columns: HitColumns = [
            HitData::new(1, 1, 0.1, 10.0),
            HitData::new(2, 2, 0.2, 20.0),
            HitData::new(3, 3, 0.3, 30.0),
        ]
        .into_iter()
        .collect();

        let picked = columns.select(&[2, 0]);
        assert_eq!(picked.detector_id, vec![3, 1]);
        assert_eq!(picked.tdc_time, vec![30.0, 10.0]);
    }
}
