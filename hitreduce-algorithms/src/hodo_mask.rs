//! Hodoscope masking of chamber hits.

use crate::filter::{HitFilter, Stage};
use hitreduce_core::{EventHits, ReductionStatistics, UniqueId, N_CHAMBER_PLANES};
use hitreduce_geom::{ChamberHodoLut, GeometryModel};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Hodoscope planes whose hits justify chamber hits by default.
pub const DEFAULT_HODO_IDS: [i32; 6] = [31, 32, 37, 38, 39, 40];

/// What to do with a chamber hit that has no lookup-table entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingLutPolicy {
    /// Drop it: nothing can justify the hit.
    #[default]
    Reject,
    /// Keep it unmasked.
    Keep,
}

impl MissingLutPolicy {
    #[inline]
    fn keeps(self) -> bool {
        self == MissingLutPolicy::Keep
    }
}

/// Keeps chamber hits that line up with a fired hodoscope paddle.
///
/// Non-chamber hits always pass.
#[derive(Clone, Debug)]
pub struct HodoMaskFilter<'a> {
    lut: &'a ChamberHodoLut,
    geometry: Option<&'a GeometryModel>,
    hodo_ids: BTreeSet<i32>,
    missing_lut_policy: MissingLutPolicy,
}

impl<'a> HodoMaskFilter<'a> {
    /// Creates a filter with the default hodoscope set and policy.
    pub fn new(lut: &'a ChamberHodoLut) -> Self {
        Self {
            lut,
            geometry: None,
            hodo_ids: DEFAULT_HODO_IDS.into_iter().collect(),
            missing_lut_policy: MissingLutPolicy::default(),
        }
    }

    /// Checks chamber element ids against the plane bounds.
    #[must_use]
    pub fn with_geometry(mut self, geometry: &'a GeometryModel) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Sets the hodoscope planes that count as active.
    #[must_use]
    pub fn with_hodo_ids<I: IntoIterator<Item = i32>>(mut self, hodo_ids: I) -> Self {
        self.hodo_ids = hodo_ids.into_iter().collect();
        self
    }

    /// Sets the policy for chamber hits without a lookup-table entry.
    #[must_use]
    pub fn with_missing_lut_policy(mut self, policy: MissingLutPolicy) -> Self {
        self.missing_lut_policy = policy;
        self
    }

    /// Hodoscope uids fired among `indices`.
    pub fn active_paddles(&self, hits: &EventHits<'_>, indices: &[usize]) -> HashSet<UniqueId> {
        indices
            .iter()
            .filter(|&&i| self.hodo_ids.contains(&hits.detector_id(i)))
            .map(|&i| hits.uid(i))
            .collect()
    }

    /// Masks the working set.
    pub fn mask(
        &self,
        hits: &EventHits<'_>,
        indices: &[usize],
        stats: &mut ReductionStatistics,
    ) -> Vec<usize> {
        let active = self.active_paddles(hits, indices);
        let mut kept = Vec::with_capacity(indices.len());
        let mut warned = HashSet::new();

        for &i in indices {
            let detector_id = hits.detector_id(i);
            if detector_id > N_CHAMBER_PLANES {
                kept.push(i);
                continue;
            }

            if let Some(geometry) = self.geometry {
                match geometry.plane(detector_id) {
                    None => {
                        if warned.insert(detector_id) {
                            log::warn!(
                                "detector {detector_id} missing from geometry in hodoscope mask"
                            );
                        }
                        stats.anomalies.missing_geometry += 1;
                        if self.missing_lut_policy.keeps() {
                            kept.push(i);
                        }
                        continue;
                    }
                    Some(plane) if !plane.contains_element(hits.element_id(i)) => {
                        stats.anomalies.element_out_of_range += 1;
                        kept.push(i);
                        continue;
                    }
                    Some(_) => {}
                }
            }

            let keep = match self.lut.get(hits.uid(i)) {
                Some(paddles) => paddles.iter().any(|paddle| active.contains(paddle)),
                None => self.missing_lut_policy.keeps(),
            };
            if keep {
                kept.push(i);
            }
        }
        kept
    }
}

impl HitFilter for HodoMaskFilter<'_> {
    fn apply(
        &self,
        hits: &EventHits<'_>,
        indices: &[usize],
        stats: &mut ReductionStatistics,
    ) -> Vec<usize> {
        self.mask(hits, indices, stats)
    }

    fn stage(&self) -> Stage {
        Stage::HodoMask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hitreduce_geom::{LookupTableBuilder, LutConfig, PlaneParams};
    use std::collections::BTreeMap;

    /// Chamber 1 (D0X, 20 wires at -19..19) masked by hodoscope 31 (4
    /// paddles, 10 cm wide, centered at -15, -5, 5, 15).
    fn setup() -> (GeometryModel, ChamberHodoLut) {
        let mut geometry = GeometryModel::new();
        geometry
            .insert(1, PlaneParams::new("D0X", 20, 2.0, 600.0))
            .unwrap();
        geometry
            .insert(2, PlaneParams::new("D0Xp", 20, 2.0, 601.0))
            .unwrap();
        geometry
            .insert(31, PlaneParams::new("H1B", 4, 10.0, 700.0))
            .unwrap();
        let config = LutConfig::default()
            .with_associations(BTreeMap::from([(31, vec![1])]))
            .with_slopes(0.0, 0.0)
            .with_buffer(0);
        let lut = LookupTableBuilder::new(config).build(&geometry);
        (geometry, lut)
    }

    #[test]
    fn test_chamber_hits_need_matching_paddle() {
        let (geometry, lut) = setup();
        // Wire 3 sits under paddle 1, wire 18 under paddle 4.
        let det = [1, 1, 31, 45];
        let elem = [3, 18, 1, 2];
        let drift = [0.0; 4];
        let tdc = [0.0; 4];
        let hits = EventHits::new(&det, &elem, &drift, &tdc).unwrap();
        let filter = HodoMaskFilter::new(&lut).with_geometry(&geometry);
        let mut stats = ReductionStatistics::default();

        let kept = filter.mask(&hits, &[0, 1, 2, 3], &mut stats);
        assert_eq!(kept, vec![0, 2, 3]);
        assert!(stats.anomalies.is_empty());
    }

    #[test]
    fn test_only_surviving_hodo_hits_are_active() {
        let (_, lut) = setup();
        let det = [1, 31];
        let elem = [3, 1];
        let drift = [0.0; 2];
        let tdc = [0.0; 2];
        let hits = EventHits::new(&det, &elem, &drift, &tdc).unwrap();
        let filter = HodoMaskFilter::new(&lut);
        let mut stats = ReductionStatistics::default();

        assert!(filter.mask(&hits, &[0], &mut stats).is_empty());
        // Hodoscope ids outside the configured set do not count either.
        let filter = filter.with_hodo_ids([32]);
        assert_eq!(filter.mask(&hits, &[0, 1], &mut stats), vec![1]);
    }

    #[test]
    fn test_missing_lut_entry_policy() {
        let (geometry, lut) = setup();
        // Plane 2 has geometry but no associations, so no LUT entry.
        let det = [2, 31];
        let elem = [5, 1];
        let drift = [0.0; 2];
        let tdc = [0.0; 2];
        let hits = EventHits::new(&det, &elem, &drift, &tdc).unwrap();
        let mut stats = ReductionStatistics::default();

        let strict = HodoMaskFilter::new(&lut).with_geometry(&geometry);
        assert_eq!(strict.mask(&hits, &[0, 1], &mut stats), vec![1]);

        let lenient = strict.with_missing_lut_policy(MissingLutPolicy::Keep);
        assert_eq!(lenient.mask(&hits, &[0, 1], &mut stats), vec![0, 1]);
        assert!(stats.anomalies.is_empty());
    }

    #[test]
    fn test_geometry_anomalies() {
        let (geometry, lut) = setup();
        let det = [7, 1, 31];
        let elem = [3, 25, 1];
        let drift = [0.0; 3];
        let tdc = [0.0; 3];
        let hits = EventHits::new(&det, &elem, &drift, &tdc).unwrap();
        let filter = HodoMaskFilter::new(&lut).with_geometry(&geometry);
        let mut stats = ReductionStatistics::default();

        // Plane 7 is unknown and rejected; element 25 of plane 1 is out of
        // range and passed through.
        let kept = filter.mask(&hits, &[0, 1, 2], &mut stats);
        assert_eq!(kept, vec![1, 2]);
        assert_eq!(stats.anomalies.missing_geometry, 1);
        assert_eq!(stats.anomalies.element_out_of_range, 1);
    }

    #[test]
    fn test_missing_plane_counted_per_hit() {
        let (geometry, lut) = setup();
        let det = [7, 7, 8, 31];
        let elem = [3, 4, 1, 1];
        let drift = [0.0; 4];
        let tdc = [0.0; 4];
        let hits = EventHits::new(&det, &elem, &drift, &tdc).unwrap();
        let mut stats = ReductionStatistics::default();

        let filter = HodoMaskFilter::new(&lut).with_geometry(&geometry);
        assert_eq!(filter.mask(&hits, &[0, 1, 2, 3], &mut stats), vec![3]);
        assert_eq!(stats.anomalies.missing_geometry, 3);

        let lenient = filter.with_missing_lut_policy(MissingLutPolicy::Keep);
        let kept = lenient.mask(&hits, &[0, 1, 2, 3], &mut stats);
        assert_eq!(kept, vec![0, 1, 2, 3]);
        assert_eq!(stats.anomalies.missing_geometry, 6);
    }
}
