//! Common interface of the pipeline stages.

use hitreduce_core::{EventHits, ReductionStatistics, StageCounts};

/// One stage of the reduction pipeline.
///
/// A stage reads the event through `hits`, considers only the hits named by
/// `indices` and returns the subset it keeps. Stages never modify hit values.
/// Anomalies and cluster counts are recorded in `stats`; the removal count is
/// recorded by the caller.
pub trait HitFilter: Send + Sync {
    /// Filters the working set.
    fn apply(
        &self,
        hits: &EventHits<'_>,
        indices: &[usize],
        stats: &mut ReductionStatistics,
    ) -> Vec<usize>;

    /// Which pipeline stage this filter implements.
    fn stage(&self) -> Stage;
}

/// Pipeline stages in their fixed execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Dedup,
    OutOfTime,
    Decluster,
    HodoMask,
    Sagitta,
}

impl Stage {
    /// Stage name as used in configuration and logs.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Dedup => "dedup",
            Stage::OutOfTime => "outoftime",
            Stage::Decluster => "decluster",
            Stage::HodoMask => "hodomask",
            Stage::Sagitta => "sagitta",
        }
    }

    /// Removal counter of this stage.
    pub fn counter(self, counts: &mut StageCounts) -> &mut usize {
        match self {
            Stage::Dedup => &mut counts.dedup,
            Stage::OutOfTime => &mut counts.out_of_time,
            Stage::Decluster => &mut counts.decluster,
            Stage::HodoMask => &mut counts.hodo_mask,
            Stage::Sagitta => &mut counts.sagitta,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
