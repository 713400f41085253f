//! Duplicate hit removal.

use crate::filter::{HitFilter, Stage};
use hitreduce_core::{EventHits, ReductionStatistics};
use std::collections::HashSet;

/// Keeps the first hit seen for every (detector, element) pair.
///
/// Survivors keep their relative order. Running the result through again
/// returns it unchanged.
pub fn deduplicate(hits: &EventHits<'_>, indices: &[usize]) -> Vec<usize> {
    let mut seen = HashSet::with_capacity(indices.len());
    indices
        .iter()
        .copied()
        .filter(|&i| seen.insert(hits.sort_key(i)))
        .collect()
}

/// Pipeline stage wrapping [`deduplicate`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Deduplicator;

impl HitFilter for Deduplicator {
    fn apply(
        &self,
        hits: &EventHits<'_>,
        indices: &[usize],
        _stats: &mut ReductionStatistics,
    ) -> Vec<usize> {
        deduplicate(hits, indices)
    }

    fn stage(&self) -> Stage {
        Stage::Dedup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_occurrence_wins() {
        let det = [3, 3, 4, 3, 4];
        let elem = [10, 11, 10, 10, 10];
        let drift = [0.0; 5];
        let tdc = [0.0; 5];
        let hits = EventHits::new(&det, &elem, &drift, &tdc).unwrap();

        let kept = deduplicate(&hits, &[0, 1, 2, 3, 4]);
        assert_eq!(kept, vec![0, 1, 2]);

        // Input order decides which duplicate survives.
        let kept = deduplicate(&hits, &[3, 4, 0, 1]);
        assert_eq!(kept, vec![3, 4, 1]);
    }

    #[test]
    fn test_output_is_unique_subset() {
        let det = [1, 1, 2, 2, 1, 2, 1];
        let elem = [5, 5, 5, 6, 6, 5, 5];
        let drift = [0.0; 7];
        let tdc = [0.0; 7];
        let hits = EventHits::new(&det, &elem, &drift, &tdc).unwrap();
        let input = [6, 0, 1, 2, 3, 4, 5];

        let kept = deduplicate(&hits, &input);
        let keys: HashSet<_> = kept.iter().map(|&i| hits.sort_key(i)).collect();
        assert_eq!(keys.len(), kept.len());
        assert!(kept.iter().all(|i| input.contains(i)));
        assert_eq!(kept, vec![6, 2, 3, 4]);
    }

    #[test]
    fn test_idempotent() {
        let det = [7, 7, 7, 8];
        let elem = [1, 2, 1, 1];
        let drift = [0.0; 4];
        let tdc = [0.0; 4];
        let hits = EventHits::new(&det, &elem, &drift, &tdc).unwrap();

        let once = deduplicate(&hits, &[0, 1, 2, 3]);
        let twice = deduplicate(&hits, &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty() {
        let hits = EventHits::new(&[], &[], &[], &[]).unwrap();
        assert!(deduplicate(&hits, &[]).is_empty());
    }
}
