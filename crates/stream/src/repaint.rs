//! Full-rebuild policy for algorithms whose past output depends on later data.
//!
//! A repaint hub recomputes its whole cache from the retained upstream on
//! every mutation, then reports downstream only the span that actually
//! changed.

use crate::cache::OrderedCache;
use strata_types::Series;

/// What a full recompute changed in an existing cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepaintOutcome {
    /// Identical output.
    Unchanged,
    /// Only a new tail position at this index.
    Appended(usize),
    /// Every position from this index onward may differ.
    Rebuilt(usize),
}

/// First index at which `old` and `new` differ, or the shorter length.
#[must_use]
pub fn first_difference<T: PartialEq>(old: &[T], new: &[T]) -> usize {
    old.iter()
        .zip(new)
        .position(|(a, b)| a != b)
        .unwrap_or_else(|| old.len().min(new.len()))
}

/// Overwrites `cache` with `fresh`, touching only the changed suffix.
pub(crate) fn apply<T: Series + PartialEq>(
    cache: &mut OrderedCache<T>,
    fresh: Vec<T>,
) -> RepaintOutcome {
    let old_len = cache.len();
    let new_len = fresh.len();
    let from = first_difference(cache.as_slice(), &fresh);

    if from == old_len && from == new_len {
        return RepaintOutcome::Unchanged;
    }

    cache.truncate(from);
    for item in fresh.into_iter().skip(from) {
        cache.push(item);
    }

    if from == old_len && new_len == old_len + 1 {
        RepaintOutcome::Appended(from)
    } else {
        RepaintOutcome::Rebuilt(from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_types::TimeValue;

    fn series(values: &[f64]) -> Vec<TimeValue> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| TimeValue::new(i as i64, v))
            .collect()
    }

    fn cache_of(values: &[f64]) -> OrderedCache<TimeValue> {
        let mut cache = OrderedCache::new();
        for item in series(values) {
            cache.push(item);
        }
        cache
    }

    #[test]
    fn test_first_difference() {
        assert_eq!(first_difference(&[1, 2, 3], &[1, 2, 3]), 3);
        assert_eq!(first_difference(&[1, 2, 3], &[1, 9, 3]), 1);
        assert_eq!(first_difference(&[1, 2], &[1, 2, 3]), 2);
        assert_eq!(first_difference::<i32>(&[], &[1]), 0);
    }

    #[test]
    fn test_apply_detects_tail_append() {
        let mut cache = cache_of(&[1.0, 2.0]);
        let outcome = apply(&mut cache, series(&[1.0, 2.0, 3.0]));

        assert_eq!(outcome, RepaintOutcome::Appended(2));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_apply_rewrites_changed_suffix() {
        let mut cache = cache_of(&[1.0, 2.0, 3.0]);
        let outcome = apply(&mut cache, series(&[1.0, 5.0, 3.0, 4.0]));

        assert_eq!(outcome, RepaintOutcome::Rebuilt(1));
        let values: Vec<f64> = cache.as_slice().iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 5.0, 3.0, 4.0]);
    }

    #[test]
    fn test_apply_handles_shrink_and_no_change() {
        let mut cache = cache_of(&[1.0, 2.0, 3.0]);
        assert_eq!(
            apply(&mut cache, series(&[1.0, 2.0, 3.0])),
            RepaintOutcome::Unchanged
        );

        assert_eq!(
            apply(&mut cache, series(&[1.0, 2.0])),
            RepaintOutcome::Rebuilt(2)
        );
        assert_eq!(cache.len(), 2);
    }
}
