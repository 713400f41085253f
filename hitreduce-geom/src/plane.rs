//! Detector plane description and per-plane geometric queries.
#![allow(clippy::cast_precision_loss)]

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One row of the plane-parameter table.
///
/// Lengths are in centimeters and angles in radians.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaneParams {
    /// Plane name, e.g. `D0X` or `H1B`. Determines the plane type.
    pub name: String,
    /// Number of wires or paddles.
    pub n_elements: i32,
    /// Distance between neighbouring element centers.
    pub spacing: f64,
    /// Width of one cell.
    pub cell_width: f64,
    /// Tilt of the wires with respect to the vertical.
    pub angle_from_vert: f64,
    /// Offset of the element grid along the measurement direction.
    pub xoffset: f64,
    /// Physical width of the plane.
    pub width: f64,
    /// Physical height of the plane.
    pub height: f64,
    /// Plane center, x.
    pub x0: f64,
    /// Plane center, y.
    pub y0: f64,
    /// Plane center, z.
    pub z0: f64,
    /// Rotation about x.
    pub theta_x: f64,
    /// Rotation about y.
    pub theta_y: f64,
    /// Rotation about z.
    pub theta_z: f64,
    /// Alignment correction along the measurement direction.
    #[serde(default)]
    pub delta_w: f64,
}

impl PlaneParams {
    /// Creates parameters for an unrotated plane centered on the beam axis.
    ///
    /// Mostly useful for tests and synthetic setups; the remaining fields can
    /// be adjusted with the `with_*` methods.
    pub fn new(name: impl Into<String>, n_elements: i32, spacing: f64, z0: f64) -> Self {
        Self {
            name: name.into(),
            n_elements,
            spacing,
            cell_width: spacing,
            angle_from_vert: 0.0,
            xoffset: 0.0,
            width: f64::from(n_elements) * spacing,
            height: 100.0,
            x0: 0.0,
            y0: 0.0,
            z0,
            theta_x: 0.0,
            theta_y: 0.0,
            theta_z: 0.0,
            delta_w: 0.0,
        }
    }

    /// Sets the cell width.
    #[must_use]
    pub fn with_cell_width(mut self, cell_width: f64) -> Self {
        self.cell_width = cell_width;
        self
    }

    /// Sets the wire tilt.
    #[must_use]
    pub fn with_angle(mut self, angle_from_vert: f64) -> Self {
        self.angle_from_vert = angle_from_vert;
        self
    }

    /// Sets the physical extent.
    #[must_use]
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the transverse center.
    #[must_use]
    pub fn with_center(mut self, x0: f64, y0: f64) -> Self {
        self.x0 = x0;
        self.y0 = y0;
        self
    }

    /// Sets the grid offset.
    #[must_use]
    pub fn with_xoffset(mut self, xoffset: f64) -> Self {
        self.xoffset = xoffset;
        self
    }
}

/// Wire geometry class of a plane, derived from its name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaneType {
    /// X, T and B planes: vertical wires measuring x.
    Straight,
    /// U or V planes tilted by a positive angle.
    TiltedPositive,
    /// U or V planes tilted by a negative angle.
    TiltedNegative,
    /// Y, L and R planes: horizontal elements measuring y.
    Transverse,
    /// Name not recognized; the plane takes no part in geometric filters.
    Unknown,
}

impl PlaneType {
    /// Classifies a plane by name and tilt angle.
    ///
    /// The checks run in order, so `H4Y1L` is transverse and `D0Xp` straight.
    pub fn classify(name: &str, angle_from_vert: f64) -> Self {
        let has = |chars: &[char]| name.chars().any(|c| chars.contains(&c));
        if has(&['X', 'T', 'B']) {
            PlaneType::Straight
        } else if has(&['U', 'V']) && angle_from_vert > 0.0 {
            PlaneType::TiltedPositive
        } else if has(&['U', 'V']) && angle_from_vert < 0.0 {
            PlaneType::TiltedNegative
        } else if has(&['Y', 'L', 'R']) {
            PlaneType::Transverse
        } else {
            PlaneType::Unknown
        }
    }

    /// Numeric code used in the geometry tables (1-4, -1 for unknown).
    pub fn code(self) -> i32 {
        match self {
            PlaneType::Straight => 1,
            PlaneType::TiltedPositive => 2,
            PlaneType::TiltedNegative => 3,
            PlaneType::Transverse => 4,
            PlaneType::Unknown => -1,
        }
    }

    /// Returns false for planes that cannot take part in geometric filters.
    pub fn is_geometric(self) -> bool {
        self != PlaneType::Unknown
    }
}

/// Axis-aligned rectangle in the transverse (x, y) plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElementBox {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl ElementBox {
    /// Grows the box by `dx` on both x edges and `dy` on both y edges.
    #[must_use]
    pub fn expanded(self, dx: f64, dy: f64) -> Self {
        Self {
            x_min: self.x_min - dx,
            x_max: self.x_max + dx,
            y_min: self.y_min - dy,
            y_max: self.y_max + dy,
        }
    }
}

/// Intersection of two closed intervals, `None` if they are disjoint.
fn overlap(a: (f64, f64), b: (f64, f64)) -> Option<(f64, f64)> {
    let lo = a.0.max(b.0);
    let hi = a.1.min(b.1);
    (lo <= hi).then_some((lo, hi))
}

/// A detector plane with its derived wire positions.
#[derive(Clone, Debug)]
pub struct Plane {
    detector_id: i32,
    params: PlaneParams,
    plane_type: PlaneType,
    cos_theta: f64,
    sin_theta: f64,
    /// Wire centers indexed by `element_id - 1`.
    wire_positions: Vec<f64>,
    /// (position, element id) sorted by position, for inverse lookup.
    sorted_positions: Vec<(f64, i32)>,
}

impl Plane {
    /// Builds a plane and precomputes its wire positions.
    pub fn new(detector_id: i32, params: PlaneParams) -> Self {
        let theta = params.angle_from_vert + params.theta_z;
        let plane_type = PlaneType::classify(&params.name, params.angle_from_vert);
        let mut plane = Self {
            detector_id,
            params,
            plane_type,
            cos_theta: theta.cos(),
            sin_theta: theta.sin(),
            wire_positions: Vec::new(),
            sorted_positions: Vec::new(),
        };

        let n = plane.params.n_elements.max(0);
        plane.wire_positions = (1..=n).map(|e| plane.compute_wire_position(e)).collect();
        plane.sorted_positions = plane
            .wire_positions
            .iter()
            .zip(1..=n)
            .map(|(&pos, e)| (pos, e))
            .collect();
        plane
            .sorted_positions
            .sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        plane
    }

    fn compute_wire_position(&self, element_id: i32) -> f64 {
        let p = &self.params;
        (f64::from(element_id) - f64::from(p.n_elements + 1) / 2.0) * p.spacing
            + p.xoffset
            + p.x0 * self.cos_theta
            + p.y0 * self.sin_theta
            + p.delta_w
    }

    /// Detector id of the plane.
    #[inline]
    pub fn detector_id(&self) -> i32 {
        self.detector_id
    }

    /// Plane name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.params.name
    }

    /// Raw table parameters.
    #[inline]
    pub fn params(&self) -> &PlaneParams {
        &self.params
    }

    /// Wire geometry class.
    #[inline]
    pub fn plane_type(&self) -> PlaneType {
        self.plane_type
    }

    /// Number of elements.
    #[inline]
    pub fn n_elements(&self) -> i32 {
        self.params.n_elements
    }

    /// Element spacing.
    #[inline]
    pub fn spacing(&self) -> f64 {
        self.params.spacing
    }

    /// Cell width.
    #[inline]
    pub fn cell_width(&self) -> f64 {
        self.params.cell_width
    }

    /// Position of the plane along the beam.
    #[inline]
    pub fn z(&self) -> f64 {
        self.params.z0
    }

    /// Cosine of the total rotation.
    #[inline]
    pub fn cos_theta(&self) -> f64 {
        self.cos_theta
    }

    /// Sine of the total rotation.
    #[inline]
    pub fn sin_theta(&self) -> f64 {
        self.sin_theta
    }

    /// Returns true if `element_id` lies within [1, n_elements].
    #[inline]
    pub fn contains_element(&self, element_id: i32) -> bool {
        (1..=self.params.n_elements).contains(&element_id)
    }

    /// Position of an element's wire along the measurement direction.
    ///
    /// Elements outside the plane are extrapolated with the same formula.
    pub fn wire_position(&self, element_id: i32) -> f64 {
        usize::try_from(element_id - 1)
            .ok()
            .and_then(|i| self.wire_positions.get(i).copied())
            .unwrap_or_else(|| self.compute_wire_position(element_id))
    }

    /// Transverse x range covered by the plane.
    pub fn x_extent(&self) -> (f64, f64) {
        let half = 0.5 * self.params.width;
        (self.params.x0 - half, self.params.x0 + half)
    }

    /// Transverse y range covered by the plane.
    pub fn y_extent(&self) -> (f64, f64) {
        let half = 0.5 * self.params.height;
        (self.params.y0 - half, self.params.y0 + half)
    }

    /// Bounding box of one element.
    ///
    /// Straight planes are bounded in x by the cell around the wire and in y
    /// by the plane height; every other type swaps the two.
    pub fn element_box(&self, element_id: i32) -> ElementBox {
        let center = self.wire_position(element_id);
        let half_cell = 0.5 * self.params.cell_width;
        if self.plane_type == PlaneType::Straight {
            let (y_min, y_max) = self.y_extent();
            ElementBox {
                x_min: center - half_cell,
                x_max: center + half_cell,
                y_min,
                y_max,
            }
        } else {
            let (x_min, x_max) = self.x_extent();
            ElementBox {
                x_min,
                x_max,
                y_min: center - half_cell,
                y_max: center + half_cell,
            }
        }
    }

    /// Element nearest to a projected position.
    ///
    /// Returns `0` below the covered range and `n_elements + 1` above it; the
    /// covered range extends half a spacing beyond the outermost wires. A
    /// position exactly half way between two wires resolves to the lower one.
    pub fn expected_element_id(&self, pos: f64) -> i32 {
        let (Some(&(first, first_id)), Some(&(last, last_id))) =
            (self.sorted_positions.first(), self.sorted_positions.last())
        else {
            return 0;
        };
        let half = 0.5 * self.params.spacing.abs();

        if pos < first - half {
            return 0;
        }
        if pos > last + half {
            return self.params.n_elements + 1;
        }

        // Number of wires at or below pos.
        let k = self.sorted_positions.partition_point(|&(p, _)| p <= pos);
        if k == 0 {
            return first_id;
        }
        if k == self.sorted_positions.len() {
            return last_id;
        }

        let (below, below_id) = self.sorted_positions[k - 1];
        let (_, above_id) = self.sorted_positions[k];
        if pos - below > half {
            above_id
        } else {
            below_id
        }
    }

    /// Returns true if the wire of `element_id`, restricted to the plane's
    /// physical extent, crosses `bounds`.
    ///
    /// The wire is the line `x·cosθ + y·sinθ = w`. It is parametrized along
    /// whichever transverse axis it runs closer to.
    pub fn wire_crosses_box(&self, element_id: i32, bounds: &ElementBox) -> bool {
        let w = self.wire_position(element_id);
        let (c, s) = (self.cos_theta, self.sin_theta);

        if c.abs() >= s.abs() {
            let Some((y_lo, y_hi)) = overlap(self.y_extent(), (bounds.y_min, bounds.y_max))
            else {
                return false;
            };
            let xa = (w - y_lo * s) / c;
            let xb = (w - y_hi * s) / c;
            overlap((xa.min(xb), xa.max(xb)), (bounds.x_min, bounds.x_max)).is_some()
        } else {
            let Some((x_lo, x_hi)) = overlap(self.x_extent(), (bounds.x_min, bounds.x_max))
            else {
                return false;
            };
            let ya = (w - x_lo * c) / s;
            let yb = (w - x_hi * c) / s;
            overlap((ya.min(yb), ya.max(yb)), (bounds.y_min, bounds.y_max)).is_some()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn x_plane() -> Plane {
        // 10 wires, 2 cm apart, centered: positions -9, -7, ..., 9
        Plane::new(3, PlaneParams::new("D0X", 10, 2.0, 600.0))
    }

    #[test]
    fn test_plane_type_classification() {
        assert_eq!(PlaneType::classify("D0X", 0.0), PlaneType::Straight);
        assert_eq!(PlaneType::classify("D0Xp", 0.0), PlaneType::Straight);
        assert_eq!(PlaneType::classify("H1T", 0.0), PlaneType::Straight);
        assert_eq!(PlaneType::classify("H2B", 0.0), PlaneType::Straight);
        assert_eq!(PlaneType::classify("D0U", 0.244), PlaneType::TiltedPositive);
        assert_eq!(PlaneType::classify("D0V", -0.244), PlaneType::TiltedNegative);
        assert_eq!(PlaneType::classify("H4Y1L", 1.5708), PlaneType::Transverse);
        assert_eq!(PlaneType::classify("H1R", 1.5708), PlaneType::Transverse);
        assert_eq!(PlaneType::classify("Q7", 0.0), PlaneType::Unknown);
        // Untilted U/V planes fall through to the Y/L/R check.
        assert_eq!(PlaneType::classify("D0U", 0.0), PlaneType::Unknown);
        assert_eq!(PlaneType::Unknown.code(), -1);
        assert!(!PlaneType::Unknown.is_geometric());
    }

    #[test]
    fn test_wire_position_centered() {
        let plane = x_plane();
        assert_relative_eq!(plane.wire_position(1), -9.0);
        assert_relative_eq!(plane.wire_position(10), 9.0);
        assert_relative_eq!(plane.wire_position(5), -1.0);
        // Out-of-range elements are extrapolated.
        assert_relative_eq!(plane.wire_position(11), 11.0);
        assert_relative_eq!(plane.wire_position(0), -11.0);
    }

    #[test]
    fn test_wire_position_with_offsets() {
        let params = PlaneParams::new("D0U", 4, 1.0, 600.0)
            .with_angle(0.5)
            .with_center(2.0, 3.0)
            .with_xoffset(0.25);
        let plane = Plane::new(1, params);
        let expected = (1.0 - 2.5) * 1.0 + 0.25 + 2.0 * 0.5_f64.cos() + 3.0 * 0.5_f64.sin();
        assert_relative_eq!(plane.wire_position(1), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_element_box_straight() {
        let params = PlaneParams::new("H1B", 10, 2.0, 650.0)
            .with_cell_width(2.5)
            .with_size(20.0, 40.0)
            .with_center(0.0, -20.0);
        let plane = Plane::new(31, params);
        let b = plane.element_box(10);
        assert_relative_eq!(b.x_min, 7.75);
        assert_relative_eq!(b.x_max, 10.25);
        assert_relative_eq!(b.y_min, -40.0);
        assert_relative_eq!(b.y_max, 0.0);
    }

    #[test]
    fn test_element_box_transverse() {
        let params = PlaneParams::new("H4Y1L", 4, 10.0, 2200.0)
            .with_angle(std::f64::consts::FRAC_PI_2)
            .with_size(60.0, 40.0)
            .with_center(-30.0, 0.0);
        let plane = Plane::new(41, params);
        let b = plane.element_box(1);
        assert_relative_eq!(b.x_min, -60.0);
        assert_relative_eq!(b.x_max, 0.0);
        let center = plane.wire_position(1);
        assert_relative_eq!(b.y_min, center - 5.0);
        assert_relative_eq!(b.y_max, center + 5.0);
    }

    #[test]
    fn test_expected_element_id() {
        let plane = x_plane();
        assert_eq!(plane.expected_element_id(-9.0), 1);
        assert_eq!(plane.expected_element_id(-7.2), 2);
        assert_eq!(plane.expected_element_id(8.9), 10);
        // Half a spacing beyond the last wire is still covered.
        assert_eq!(plane.expected_element_id(10.0), 10);
        assert_eq!(plane.expected_element_id(-10.0), 1);
    }

    #[test]
    fn test_expected_element_id_sentinels() {
        let plane = x_plane();
        assert_eq!(plane.expected_element_id(-10.01), 0);
        assert_eq!(plane.expected_element_id(10.01), 11);
        assert_eq!(plane.expected_element_id(f64::NEG_INFINITY), 0);
        assert_eq!(plane.expected_element_id(f64::INFINITY), 11);
    }

    #[test]
    fn test_expected_element_id_half_spacing_tie() {
        let plane = x_plane();
        // Exactly between wires 5 (-1.0) and 6 (1.0).
        assert_eq!(plane.expected_element_id(0.0), 5);
        assert_eq!(plane.expected_element_id(1e-9), 6);
    }

    #[test]
    fn test_expected_element_id_inverts_wire_position() {
        let plane = x_plane();
        for e in 1..=plane.n_elements() {
            assert_eq!(plane.expected_element_id(plane.wire_position(e)), e);
        }
    }

    #[test]
    fn test_wire_crosses_box_straight() {
        let plane = x_plane();
        let bounds = ElementBox {
            x_min: -2.0,
            x_max: 2.0,
            y_min: -10.0,
            y_max: 10.0,
        };
        assert!(plane.wire_crosses_box(5, &bounds));
        assert!(plane.wire_crosses_box(6, &bounds));
        assert!(!plane.wire_crosses_box(4, &bounds));
        // Box above the plane's height never overlaps.
        let far = ElementBox {
            y_min: 60.0,
            y_max: 80.0,
            ..bounds
        };
        assert!(!plane.wire_crosses_box(5, &far));
    }

    #[test]
    fn test_wire_crosses_box_tilted() {
        // A wire tilted by 45 degrees through the origin reaches x = -10 at
        // the top of a 20 cm tall plane.
        let params = PlaneParams::new("D2U", 1, 1.0, 1300.0)
            .with_angle(std::f64::consts::FRAC_PI_4)
            .with_size(40.0, 20.0);
        let plane = Plane::new(17, params);
        assert_relative_eq!(plane.wire_position(1), 0.0);

        let upper_left = ElementBox {
            x_min: -11.0,
            x_max: -9.0,
            y_min: 8.0,
            y_max: 12.0,
        };
        assert!(plane.wire_crosses_box(1, &upper_left));

        let upper_right = ElementBox {
            x_min: 9.0,
            x_max: 11.0,
            y_min: 8.0,
            y_max: 12.0,
        };
        assert!(!plane.wire_crosses_box(1, &upper_right));
    }

    #[test]
    fn test_element_box_expand() {
        let b = ElementBox {
            x_min: 0.0,
            x_max: 1.0,
            y_min: 0.0,
            y_max: 1.0,
        };
        let big = b.expanded(0.5, 2.0);
        assert_relative_eq!(big.x_min, -0.5);
        assert_relative_eq!(big.x_max, 1.5);
        assert_relative_eq!(big.y_min, -2.0);
        assert_relative_eq!(big.y_max, 3.0);
    }
}
