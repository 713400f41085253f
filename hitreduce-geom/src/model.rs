//! Geometry model: every detector plane of the spectrometer, keyed by id.

use crate::plane::{Plane, PlaneParams, PlaneType};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Number of mandatory columns in a plane-parameter row.
const REQUIRED_COLUMNS: usize = 14;

/// Immutable description of all detector planes.
///
/// Built once per run and shared by reference with every filter.
#[derive(Clone, Debug, Default)]
pub struct GeometryModel {
    planes: BTreeMap<i32, Plane>,
}

impl GeometryModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the plane-parameter table from a file.
    ///
    /// See [`GeometryModel::parse_table`] for the format.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let model = Self::parse_table(&text)?;
        log::info!(
            "loaded geometry for {} planes from {}",
            model.len(),
            path.display()
        );
        Ok(model)
    }

    /// Parses a plane-parameter table.
    ///
    /// One row per plane, whitespace separated:
    /// `name n_ele spacing cell_width angle_from_vert xoffset width height
    /// x0 y0 z0 theta_x theta_y theta_z [delta_w]`. Lines starting with `#`
    /// and blank lines are ignored. Detector ids follow row order, starting
    /// at 1.
    pub fn parse_table(text: &str) -> Result<Self> {
        let mut rows = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            rows.push(parse_row(line, line_no + 1)?);
        }
        if rows.is_empty() {
            return Err(Error::EmptyTable);
        }
        Self::from_params(rows)
    }

    /// Builds a model from in-memory rows, numbering planes from 1.
    pub fn from_params<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = PlaneParams>,
    {
        let mut model = Self::new();
        for (detector_id, params) in (1..).zip(rows) {
            model.insert(detector_id, params)?;
        }
        Ok(model)
    }

    /// Adds or replaces the plane with the given detector id.
    pub fn insert(&mut self, detector_id: i32, params: PlaneParams) -> Result<()> {
        validate(detector_id, &params)?;
        if PlaneType::classify(&params.name, params.angle_from_vert) == PlaneType::Unknown {
            log::warn!(
                "plane {detector_id} ({}) has an unrecognized name; it will be skipped by geometric filters",
                params.name
            );
        }
        self.planes
            .insert(detector_id, Plane::new(detector_id, params));
        Ok(())
    }

    /// Builder-style [`GeometryModel::insert`].
    pub fn with_plane(mut self, detector_id: i32, params: PlaneParams) -> Result<Self> {
        self.insert(detector_id, params)?;
        Ok(self)
    }

    /// Number of planes.
    pub fn len(&self) -> usize {
        self.planes.len()
    }

    /// Returns true if the model has no planes.
    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    /// Returns true if the detector id is known.
    pub fn contains(&self, detector_id: i32) -> bool {
        self.planes.contains_key(&detector_id)
    }

    /// Plane with the given detector id.
    pub fn plane(&self, detector_id: i32) -> Option<&Plane> {
        self.planes.get(&detector_id)
    }

    /// Position of a plane along the beam.
    pub fn plane_position(&self, detector_id: i32) -> Option<f64> {
        self.plane(detector_id).map(Plane::z)
    }

    /// Wire geometry class of a plane.
    pub fn plane_type(&self, detector_id: i32) -> Option<PlaneType> {
        self.plane(detector_id).map(Plane::plane_type)
    }

    /// Number of elements of a plane.
    pub fn n_elements(&self, detector_id: i32) -> Option<i32> {
        self.plane(detector_id).map(Plane::n_elements)
    }

    /// Wire position of one element.
    pub fn wire_position(&self, detector_id: i32, element_id: i32) -> Option<f64> {
        self.plane(detector_id)
            .map(|plane| plane.wire_position(element_id))
    }

    /// Detector id of the plane with the given name.
    pub fn detector_id(&self, name: &str) -> Option<i32> {
        self.planes
            .values()
            .find(|plane| plane.name() == name)
            .map(Plane::detector_id)
    }

    /// Iterates over planes in detector id order.
    pub fn iter(&self) -> impl Iterator<Item = &Plane> {
        self.planes.values()
    }
}

fn validate(detector_id: i32, params: &PlaneParams) -> Result<()> {
    let invalid = |message: &str| Error::InvalidPlane {
        detector_id,
        name: params.name.clone(),
        message: message.to_string(),
    };
    if params.n_elements < 1 {
        return Err(invalid("plane must have at least one element"));
    }
    if params.spacing == 0.0 || !params.spacing.is_finite() {
        return Err(invalid("element spacing must be finite and non-zero"));
    }
    Ok(())
}

fn parse_row(line: &str, line_no: usize) -> Result<PlaneParams> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != REQUIRED_COLUMNS && fields.len() != REQUIRED_COLUMNS + 1 {
        return Err(Error::ParseError {
            line: line_no,
            message: format!(
                "expected {REQUIRED_COLUMNS} or {} columns, found {}",
                REQUIRED_COLUMNS + 1,
                fields.len()
            ),
        });
    }

    let number = |idx: usize, column: &str| -> Result<f64> {
        fields[idx].parse::<f64>().map_err(|e| Error::ParseError {
            line: line_no,
            message: format!("column '{column}': {e}"),
        })
    };

    let n_elements = fields[1].parse::<i32>().map_err(|e| Error::ParseError {
        line: line_no,
        message: format!("column 'n_ele': {e}"),
    })?;

    Ok(PlaneParams {
        name: fields[0].to_string(),
        n_elements,
        spacing: number(2, "cell_spacing")?,
        cell_width: number(3, "cell_width")?,
        angle_from_vert: number(4, "angle_from_vert")?,
        xoffset: number(5, "xoffset")?,
        width: number(6, "width")?,
        height: number(7, "height")?,
        x0: number(8, "x0")?,
        y0: number(9, "y0")?,
        z0: number(10, "z0")?,
        theta_x: number(11, "theta_x")?,
        theta_y: number(12, "theta_y")?,
        theta_z: number(13, "theta_z")?,
        delta_w: if fields.len() > REQUIRED_COLUMNS {
            number(14, "delta_w")?
        } else {
            0.0
        },
    })
}
