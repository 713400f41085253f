//! Event reduction pipeline.
//!
//! [`EventReducer`] chains the enabled stages in their fixed order
//! (dedup, out-of-time, decluster, hodoscope mask, sagitta) over one event
//! and maps the survivors back to original array order.

use crate::config::ReductionConfig;
use crate::decluster::DeclusterEngine;
use crate::dedup::Deduplicator;
use crate::error::{Error, Result};
use crate::filter::{HitFilter, Stage};
use crate::hodo_mask::HodoMaskFilter;
use crate::occupancy::accept_event;
use crate::sagitta::SagittaFilter;
use crate::timing::{OutOfTimeFilter, OutOfTimePolicy};
use hitreduce_core::{EventHits, ReductionStatistics, RunStatistics};
use hitreduce_geom::{ChamberHodoLut, GeometryModel};
use rayon::prelude::*;

/// Result of reducing one event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reduction {
    /// Surviving hit indices, unique and ascending.
    pub kept: Vec<usize>,
    /// What each stage did to the event.
    pub statistics: ReductionStatistics,
    /// False if the occupancy cut rejected the whole event.
    pub accepted: bool,
}

impl Reduction {
    /// Number of surviving hits.
    pub fn len(&self) -> usize {
        self.kept.len()
    }

    /// Returns true if no hit survived.
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

/// Reduces events with a fixed configuration.
///
/// The reducer borrows the geometry model and lookup table, which must be
/// built before the first event and outlive the reducer.
pub struct EventReducer<'a> {
    config: ReductionConfig,
    stages: Vec<Box<dyn HitFilter + 'a>>,
}

impl<'a> EventReducer<'a> {
    /// Builds the stage chain.
    ///
    /// Fails if the sagitta filter is enabled without a geometry model or the
    /// hodoscope mask without a lookup table.
    pub fn new(
        config: ReductionConfig,
        geometry: Option<&'a GeometryModel>,
        lut: Option<&'a ChamberHodoLut>,
    ) -> Result<Self> {
        config.validate()?;
        let mut stages: Vec<Box<dyn HitFilter + 'a>> = Vec::new();

        if config.dedup {
            stages.push(Box::new(Deduplicator));
        }
        if config.outoftime {
            stages.push(Box::new(match config.out_of_time_policy {
                OutOfTimePolicy::Uniform => OutOfTimeFilter::new(config.time_window()),
                OutOfTimePolicy::PerStation => OutOfTimeFilter::per_station(config.station_windows),
            }));
        }
        if config.decluster {
            stages.push(Box::new(DeclusterEngine::new(
                config.decluster_config(),
                geometry,
            )));
        }
        if config.hodomask {
            let lut = lut.ok_or(Error::MissingLookupTable)?;
            let mut filter = HodoMaskFilter::new(lut)
                .with_hodo_ids(config.hodo_ids.iter().copied())
                .with_missing_lut_policy(config.missing_lut_policy);
            if let Some(geometry) = geometry {
                filter = filter.with_geometry(geometry);
            }
            stages.push(Box::new(filter));
        }
        if config.sagitta {
            let geometry =
                geometry.ok_or(hitreduce_core::Error::MissingGeometry(Stage::Sagitta.name()))?;
            stages.push(Box::new(SagittaFilter::new(config.sagitta_params, geometry)));
        }

        log::debug!(
            "reducer stages: [{}]",
            stages
                .iter()
                .map(|stage| stage.stage().name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(Self { config, stages })
    }

    /// Reducer configuration.
    pub fn config(&self) -> &ReductionConfig {
        &self.config
    }

    /// Enabled stages in execution order.
    pub fn stages(&self) -> Vec<Stage> {
        self.stages.iter().map(|stage| stage.stage()).collect()
    }

    /// Reduces one event.
    pub fn reduce(&self, hits: &EventHits<'_>) -> Reduction {
        let mut statistics = ReductionStatistics {
            hits_in: hits.len(),
            ..Default::default()
        };
        for &detector_id in hits.detector_ids() {
            statistics.stations.record_in(detector_id);
        }

        if let Some(limits) = &self.config.occupancy {
            if !accept_event(hits, limits) {
                log::debug!("event with {} hits rejected by occupancy cut", hits.len());
                return Reduction {
                    kept: Vec::new(),
                    statistics,
                    accepted: false,
                };
            }
        }

        let mut indices = hits.sorted_indices();
        for stage in &self.stages {
            let before = indices.len();
            indices = stage.apply(hits, &indices, &mut statistics);
            *stage.stage().counter(&mut statistics.removed) += before - indices.len();
        }
        indices.sort_unstable();

        statistics.hits_kept = indices.len();
        for &i in &indices {
            statistics.stations.record_kept(hits.detector_id(i));
        }
        log::debug!(
            "event reduced {} -> {} hits ({} clusters)",
            statistics.hits_in,
            statistics.hits_kept,
            statistics.clusters_found
        );

        Reduction {
            kept: indices,
            statistics,
            accepted: true,
        }
    }

    /// Reduces events in parallel, results in input order.
    pub fn reduce_batch(&self, events: &[EventHits<'_>]) -> Vec<Reduction> {
        events.par_iter().map(|hits| self.reduce(hits)).collect()
    }
}

/// Folds per-event results into run statistics.
pub fn summarize<'r, I>(reductions: I) -> RunStatistics
where
    I: IntoIterator<Item = &'r Reduction>,
{
    let mut run = RunStatistics::new();
    for reduction in reductions {
        run.record(&reduction.statistics, reduction.accepted);
    }
    run
}
