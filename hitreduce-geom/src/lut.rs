//! Chamber-to-hodoscope lookup table.
//!
//! For every hodoscope paddle, the chamber elements a straight track through
//! that paddle could have fired are found by projecting the paddle's box to
//! each associated chamber plane, widened by the maximum track slopes.

use crate::model::GeometryModel;
use crate::plane::{ElementBox, Plane, PlaneType};
use crate::Result;
use hitreduce_core::detector::is_chamber;
use hitreduce_core::UniqueId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;

/// Parameters of the lookup-table construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LutConfig {
    /// Hodoscope detector id to the chamber detector ids it masks.
    pub associations: BTreeMap<i32, Vec<i32>>,
    /// Maximum track slope in x.
    pub tx_max: f64,
    /// Maximum track slope in y.
    pub ty_max: f64,
    /// Extra elements added on each side of every matched range.
    pub buffer: i32,
}

impl Default for LutConfig {
    fn default() -> Self {
        let mut associations = BTreeMap::new();
        for hodo in [31, 32] {
            associations.insert(hodo, (1..=6).collect());
        }
        for hodo in [37, 38] {
            associations.insert(hodo, (13..=18).collect());
        }
        associations.insert(40, (19..=24).collect());
        associations.insert(39, (25..=30).collect());
        Self {
            associations,
            tx_max: 0.15,
            ty_max: 0.10,
            buffer: 2,
        }
    }
}

impl LutConfig {
    /// Sets the slope limits.
    #[must_use]
    pub fn with_slopes(mut self, tx_max: f64, ty_max: f64) -> Self {
        self.tx_max = tx_max;
        self.ty_max = ty_max;
        self
    }

    /// Sets the buffer width.
    #[must_use]
    pub fn with_buffer(mut self, buffer: i32) -> Self {
        self.buffer = buffer;
        self
    }

    /// Replaces the hodoscope-to-chamber associations.
    #[must_use]
    pub fn with_associations(mut self, associations: BTreeMap<i32, Vec<i32>>) -> Self {
        self.associations = associations;
        self
    }

    /// Hodoscope ids that appear in the associations.
    pub fn hodo_ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.associations.keys().copied()
    }
}

/// Read-only map from chamber element to the hodoscope paddles covering it.
#[derive(Clone, Debug, Default)]
pub struct ChamberHodoLut {
    entries: HashMap<UniqueId, Vec<UniqueId>>,
}

impl ChamberHodoLut {
    /// Hodoscope paddles associated with a chamber element.
    #[inline]
    pub fn get(&self, chamber: UniqueId) -> Option<&[UniqueId]> {
        self.entries.get(&chamber).map(Vec::as_slice)
    }

    /// Returns true if the chamber element has an entry.
    #[inline]
    pub fn contains(&self, chamber: UniqueId) -> bool {
        self.entries.contains_key(&chamber)
    }

    /// Number of chamber elements with an entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no chamber element has an entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of (chamber, paddle) associations.
    pub fn n_associations(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Iterates over entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (UniqueId, &[UniqueId])> {
        self.entries.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    fn push(&mut self, chamber: UniqueId, hodo: UniqueId) {
        self.entries.entry(chamber).or_default().push(hodo);
    }

    /// Writes the table as a JSON object keyed by chamber uid, sorted.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        let sorted: BTreeMap<i32, Vec<i32>> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_i32(), v.iter().map(UniqueId::as_i32).collect()))
            .collect();
        serde_json::to_writer_pretty(writer, &sorted)?;
        Ok(())
    }
}

/// What the builder skipped while constructing a table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LutBuildReport {
    /// Hodoscope planes named in the associations but absent from geometry.
    pub missing_hodo_planes: Vec<i32>,
    /// (hodo, chamber) pairs skipped because the chamber plane is absent.
    pub missing_chamber_planes: Vec<(i32, i32)>,
    /// Chamber planes skipped because their type is unknown.
    pub unknown_chamber_planes: Vec<i32>,
    /// Associations whose chamber id is not a drift chamber.
    pub invalid_chambers: Vec<i32>,
    /// (paddle, chamber plane) projections that matched nothing.
    pub empty_projections: usize,
}

impl LutBuildReport {
    /// Returns true if nothing was skipped.
    pub fn is_clean(&self) -> bool {
        self.missing_hodo_planes.is_empty()
            && self.missing_chamber_planes.is_empty()
            && self.unknown_chamber_planes.is_empty()
            && self.invalid_chambers.is_empty()
    }
}

/// Builds a [`ChamberHodoLut`] from a geometry model.
#[derive(Clone, Debug, Default)]
pub struct LookupTableBuilder {
    config: LutConfig,
}

impl LookupTableBuilder {
    /// Creates a builder.
    pub fn new(config: LutConfig) -> Self {
        Self { config }
    }

    /// Builder configuration.
    pub fn config(&self) -> &LutConfig {
        &self.config
    }

    /// Builds the table, discarding the report.
    pub fn build(&self, geometry: &GeometryModel) -> ChamberHodoLut {
        self.build_with_report(geometry).0
    }

    /// Builds the table and reports what was skipped.
    pub fn build_with_report(&self, geometry: &GeometryModel) -> (ChamberHodoLut, LutBuildReport) {
        let mut lut = ChamberHodoLut::default();
        let mut report = LutBuildReport::default();
        let mut warned_unknown = HashSet::new();

        for (&hodo_id, chambers) in &self.config.associations {
            let Some(hodo) = geometry.plane(hodo_id) else {
                log::warn!("hodoscope plane {hodo_id} missing from geometry; skipped");
                report.missing_hodo_planes.push(hodo_id);
                continue;
            };

            for &chamber_id in chambers {
                if !is_chamber(chamber_id) {
                    log::warn!("association {hodo_id} -> {chamber_id} is not a drift chamber; skipped");
                    report.invalid_chambers.push(chamber_id);
                    continue;
                }
                let Some(chamber) = geometry.plane(chamber_id) else {
                    log::warn!(
                        "chamber plane {chamber_id} missing from geometry; skipped for hodoscope {hodo_id}"
                    );
                    report.missing_chamber_planes.push((hodo_id, chamber_id));
                    continue;
                };
                if chamber.plane_type() == PlaneType::Unknown {
                    if warned_unknown.insert(chamber_id) {
                        log::warn!(
                            "chamber plane {chamber_id} ({}) has unknown type; skipped",
                            chamber.name()
                        );
                        report.unknown_chamber_planes.push(chamber_id);
                    }
                    continue;
                }

                for paddle in 1..=hodo.n_elements() {
                    let Some((lo, hi)) = self.matched_range(hodo, paddle, chamber) else {
                        report.empty_projections += 1;
                        continue;
                    };
                    let (lo, hi) = self.buffered(lo, hi, chamber.n_elements());
                    let hodo_uid = UniqueId::new(hodo_id, paddle);
                    for element in lo..=hi {
                        lut.push(UniqueId::new(chamber_id, element), hodo_uid);
                    }
                }
            }
        }

        log::info!(
            "built chamber-hodoscope lookup table: {} chamber elements, {} associations",
            lut.len(),
            lut.n_associations()
        );
        (lut, report)
    }

    /// Chamber elements crossed by the projection of one hodoscope paddle,
    /// before buffering.
    ///
    /// Returns `None` when the projection misses the chamber entirely.
    pub fn matched_range(&self, hodo: &Plane, paddle: i32, chamber: &Plane) -> Option<(i32, i32)> {
        let dz = chamber.z() - hodo.z();
        let bounds = hodo
            .element_box(paddle)
            .expanded((self.config.tx_max * dz).abs(), (self.config.ty_max * dz).abs());
        let n = chamber.n_elements();

        if chamber.plane_type() == PlaneType::Straight {
            let lo = chamber.expected_element_id(bounds.x_min);
            let hi = chamber.expected_element_id(bounds.x_max);
            if hi < 1 || lo > n {
                return None;
            }
            return Some((lo.max(1), hi.min(n)));
        }

        scan_crossing(chamber, &bounds)
    }

    /// Widens `[lo, hi]` by the configured buffer, clamped to `[1, n]`.
    pub fn buffered(&self, lo: i32, hi: i32, n: i32) -> (i32, i32) {
        let buffer = self.config.buffer.max(0);
        (lo.saturating_sub(buffer).max(1), hi.saturating_add(buffer).min(n))
    }
}

fn scan_crossing(chamber: &Plane, bounds: &ElementBox) -> Option<(i32, i32)> {
    let mut range: Option<(i32, i32)> = None;
    for element in 1..=chamber.n_elements() {
        if chamber.wire_crosses_box(element, bounds) {
            range = Some(match range {
                Some((lo, hi)) => (lo.min(element), hi.max(element)),
                None => (element, element),
            });
        }
    }
    range
}
