//! Reduction pipeline configuration.
//!
//! Loaded from JSON with every field optional:
//!
//! ```json
//! {
//!   "dedup": true,
//!   "outoftime": true,
//!   "tdc_center": 950.0,
//!   "tdc_width": 7.4,
//!   "hodomask": true,
//!   "hodo_ids": [31, 32, 37, 38, 39, 40],
//!   "occupancy": { "d0": 40, "d1": 40, "d2": 40, "d3p": 40, "d3m": 40 }
//! }
//! ```

use crate::decluster::{ClusterWidth, DeclusterConfig, TwoHitOrder};
use crate::error::{Error, Result};
use crate::hodo_mask::{MissingLutPolicy, DEFAULT_HODO_IDS};
use crate::occupancy::OccupancyLimits;
use crate::sagitta::SagittaConfig;
use crate::timing::{OutOfTimePolicy, StationWindows, TimeWindow};
use hitreduce_core::detector::is_hodoscope;
use hitreduce_geom::LutConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Stage switches and stage parameters of one reduction run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionConfig {
    /// Remove duplicate (detector, element) hits.
    pub dedup: bool,
    /// Remove hits outside the timing window.
    pub outoftime: bool,
    /// Reduce clusters of adjacent chamber hits.
    pub decluster: bool,
    /// Keep only chamber hits under a fired hodoscope paddle.
    pub hodomask: bool,
    /// Keep only chamber hits on a consistent three-station triplet.
    pub sagitta: bool,

    /// Center of the uniform timing window.
    pub tdc_center: f64,
    /// Full width of the uniform timing window.
    pub tdc_width: f64,
    pub out_of_time_policy: OutOfTimePolicy,
    pub station_windows: StationWindows,

    pub cluster_width: ClusterWidth,
    pub two_hit_order: TwoHitOrder,
    pub flush_final_cluster_at_boundary: bool,

    /// Hodoscope planes whose hits count as fired paddles.
    pub hodo_ids: BTreeSet<i32>,
    pub missing_lut_policy: MissingLutPolicy,
    /// Lookup-table construction parameters.
    pub lut: LutConfig,

    /// Sagitta filter constants.
    pub sagitta_params: SagittaConfig,

    /// Whole-event occupancy cut, disabled when absent.
    pub occupancy: Option<OccupancyLimits>,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        let window = TimeWindow::default();
        Self {
            dedup: true,
            outoftime: false,
            decluster: true,
            hodomask: false,
            sagitta: false,
            tdc_center: window.center,
            tdc_width: window.width,
            out_of_time_policy: OutOfTimePolicy::default(),
            station_windows: StationWindows::default(),
            cluster_width: ClusterWidth::default(),
            two_hit_order: TwoHitOrder::default(),
            flush_final_cluster_at_boundary: false,
            hodo_ids: DEFAULT_HODO_IDS.into_iter().collect(),
            missing_lut_policy: MissingLutPolicy::default(),
            lut: LutConfig::default(),
            sagitta_params: SagittaConfig::default(),
            occupancy: None,
        }
    }
}

impl ReductionConfig {
    /// Configuration with every stage switched off.
    pub fn disabled() -> Self {
        Self {
            dedup: false,
            decluster: false,
            ..Self::default()
        }
    }

    /// Loads and validates a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a configuration string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that would make a stage meaningless.
    pub fn validate(&self) -> Result<()> {
        if !self.tdc_center.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "tdc_center must be finite, got {}",
                self.tdc_center
            )));
        }
        if !self.tdc_width.is_finite() || self.tdc_width < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "tdc_width must be a non-negative number, got {}",
                self.tdc_width
            )));
        }
        if self.hodomask && self.hodo_ids.is_empty() {
            return Err(Error::InvalidConfig(
                "hodomask is enabled but hodo_ids is empty".to_string(),
            ));
        }
        if let Some(&id) = self.hodo_ids.iter().find(|&&id| !is_hodoscope(id)) {
            return Err(Error::InvalidConfig(format!(
                "hodo_ids entry {id} is not a hodoscope plane"
            )));
        }
        if self.lut.buffer < 0 {
            return Err(Error::InvalidConfig(format!(
                "lut.buffer must not be negative, got {}",
                self.lut.buffer
            )));
        }
        if self.sagitta_params.min_window_cells < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "sagitta_params.min_window_cells must not be negative, got {}",
                self.sagitta_params.min_window_cells
            )));
        }
        Ok(())
    }

    /// True if any enabled stage reads the geometry model.
    pub fn needs_geometry(&self) -> bool {
        self.hodomask || self.sagitta
    }

    /// Uniform timing window.
    pub fn time_window(&self) -> TimeWindow {
        TimeWindow::new(self.tdc_center, self.tdc_width)
    }

    /// Declustering part of the configuration.
    pub fn decluster_config(&self) -> DeclusterConfig {
        DeclusterConfig {
            cluster_width: self.cluster_width,
            two_hit_order: self.two_hit_order,
            flush_final_cluster_at_boundary: self.flush_final_cluster_at_boundary,
        }
    }

    #[must_use]
    pub fn with_dedup(mut self, enabled: bool) -> Self {
        self.dedup = enabled;
        self
    }

    #[must_use]
    pub fn with_outoftime(mut self, enabled: bool) -> Self {
        self.outoftime = enabled;
        self
    }

    #[must_use]
    pub fn with_decluster(mut self, enabled: bool) -> Self {
        self.decluster = enabled;
        self
    }

    #[must_use]
    pub fn with_hodomask(mut self, enabled: bool) -> Self {
        self.hodomask = enabled;
        self
    }

    #[must_use]
    pub fn with_sagitta(mut self, enabled: bool) -> Self {
        self.sagitta = enabled;
        self
    }

    /// Sets the uniform timing window.
    #[must_use]
    pub fn with_time_window(mut self, tdc_center: f64, tdc_width: f64) -> Self {
        self.tdc_center = tdc_center;
        self.tdc_width = tdc_width;
        self
    }

    #[must_use]
    pub fn with_out_of_time_policy(mut self, policy: OutOfTimePolicy) -> Self {
        self.out_of_time_policy = policy;
        self
    }

    #[must_use]
    pub fn with_hodo_ids<I: IntoIterator<Item = i32>>(mut self, hodo_ids: I) -> Self {
        self.hodo_ids = hodo_ids.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_flush_final_cluster_at_boundary(mut self, flush: bool) -> Self {
        self.flush_final_cluster_at_boundary = flush;
        self
    }

    #[must_use]
    pub fn with_cluster_width(mut self, cluster_width: ClusterWidth) -> Self {
        self.cluster_width = cluster_width;
        self
    }

    #[must_use]
    pub fn with_two_hit_order(mut self, order: TwoHitOrder) -> Self {
        self.two_hit_order = order;
        self
    }

    #[must_use]
    pub fn with_missing_lut_policy(mut self, policy: MissingLutPolicy) -> Self {
        self.missing_lut_policy = policy;
        self
    }

    #[must_use]
    pub fn with_sagitta_params(mut self, params: SagittaConfig) -> Self {
        self.sagitta_params = params;
        self
    }

    #[must_use]
    pub fn with_lut(mut self, lut: LutConfig) -> Self {
        self.lut = lut;
        self
    }

    #[must_use]
    pub fn with_occupancy(mut self, limits: Option<OccupancyLimits>) -> Self {
        self.occupancy = limits;
        self
    }
}
