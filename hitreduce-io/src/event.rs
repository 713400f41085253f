//! Event records as exchanged with the outside world.

use crate::Result;
use hitreduce_core::{EventHits, HitColumns};
use serde::{Deserialize, Serialize};

/// One event: an id and its four hit columns.
///
/// Serialized as a flat JSON object:
///
/// ```json
/// {"event_id": 7, "detector_id": [3, 31], "element_id": [80, 12],
///  "drift_distance": [0.21, 0.0], "tdc_time": [950.2, 948.0]}
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: u64,
    #[serde(flatten)]
    pub hits: HitColumns,
}

impl EventRecord {
    /// Creates a record.
    pub fn new(event_id: u64, hits: HitColumns) -> Self {
        Self { event_id, hits }
    }

    /// Number of hits.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the event has no hits.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Borrows the hits for filtering.
    pub fn as_event(&self) -> Result<EventHits<'_>> {
        Ok(self.hits.as_event()?)
    }

    /// Record holding only the hits at `kept`, in that order.
    pub fn reduced(&self, kept: &[usize]) -> Result<Self> {
        self.as_event()?.check_indices(kept)?;
        Ok(Self {
            event_id: self.event_id,
            hits: self.hits.select(kept),
        })
    }
}
