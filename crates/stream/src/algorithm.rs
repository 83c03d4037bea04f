//! Plugin contract for streaming algorithms.
//!
//! A hub owns one [`Algorithm`] and calls it once per upstream position.
//! The engine never knows indicator math; it only guarantees that
//! `transform` sees a consistent upstream prefix and a consistent result
//! prefix, and that `rollback` runs before any position is recomputed.

use strata_types::Series;

/// How a hub keeps its cache current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Extend on append, roll back and replay from the mutated position.
    Incremental,
    /// Earlier output depends on later data; rebuild everything on every
    /// mutation via [`Algorithm::recompute`].
    Repaint,
}

/// Read-only view handed to [`Algorithm::transform`] for one position.
///
/// `results` always holds exactly `index` items: this hub's output for every
/// upstream position before `index`.
#[derive(Debug)]
pub struct Frame<'a, I, O> {
    source: &'a [I],
    results: &'a [O],
    index: usize,
}

impl<'a, I, O> Frame<'a, I, O> {
    /// Creates a frame for `source[index]`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds for `source` or `results` is not
    /// exactly `index` long; both are engine invariants.
    #[must_use]
    pub fn new(source: &'a [I], results: &'a [O], index: usize) -> Self {
        assert!(index < source.len(), "frame index {index} out of bounds");
        assert_eq!(results.len(), index, "result prefix misaligned");
        Self {
            source,
            results,
            index,
        }
    }

    /// Upstream item being transformed.
    #[must_use]
    pub fn item(&self) -> &'a I {
        &self.source[self.index]
    }

    /// Position of the item in the retained upstream cache.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Upstream item just before this one.
    #[must_use]
    pub fn prior(&self) -> Option<&'a I> {
        self.index.checked_sub(1).map(|i| &self.source[i])
    }

    /// This hub's result for the previous position.
    #[must_use]
    pub fn previous(&self) -> Option<&'a O> {
        self.results.last()
    }

    /// Upstream items up to and including this one.
    #[must_use]
    pub fn history(&self) -> &'a [I] {
        &self.source[..=self.index]
    }

    /// Trailing `len` upstream items ending at this one, if retained.
    #[must_use]
    pub fn window(&self, len: usize) -> Option<&'a [I]> {
        if len == 0 || len > self.index + 1 {
            return None;
        }
        Some(&self.source[self.index + 1 - len..=self.index])
    }

    /// This hub's results before this position.
    #[must_use]
    pub fn results(&self) -> &'a [O] {
        self.results
    }

    /// Trailing `len` results before this position, if retained.
    #[must_use]
    pub fn prior_results(&self, len: usize) -> Option<&'a [O]> {
        (len <= self.results.len()).then(|| &self.results[self.results.len() - len..])
    }
}

/// A streaming computation pluggable into a hub.
///
/// Implementations must be pure given (upstream prefix, private state as it
/// stood before the position): feeding the same history through `transform`
/// twice, with a `rollback` in between, must produce identical output.
pub trait Algorithm<I: Series> {
    /// Result type aligned 1:1 with upstream positions.
    type Output: Series + Clone + PartialEq;

    /// Display name including parameters, e.g. `SMA(20)`.
    fn name(&self) -> String;

    /// Trailing upstream history needed to recompute correctly after a
    /// rollback.
    fn min_cache_size(&self) -> usize;

    /// Update policy; repaint algorithms are rebuilt from scratch on every
    /// mutation.
    fn policy(&self) -> UpdatePolicy {
        UpdatePolicy::Incremental
    }

    /// Produces the result for `frame.item()`.
    fn transform(&mut self, frame: &Frame<'_, I, Self::Output>) -> Self::Output;

    /// Resets private state to what it was just before position
    /// `results.len()`.
    ///
    /// `results` is the retained result prefix; `source` is the already
    /// mutated upstream cache.
    fn rollback(&mut self, source: &[I], results: &[Self::Output]) {
        let _ = (source, results);
    }

    /// Drops state kept for the `count` oldest positions.
    fn prune(&mut self, count: usize) {
        let _ = count;
    }

    /// Recomputes every position of `source` from an empty state.
    ///
    /// Repaint algorithms override this with their batch algorithm.
    fn recompute(&mut self, source: &[I]) -> Vec<Self::Output> {
        let mut results = Vec::with_capacity(source.len());
        self.rollback(source, &results);
        for index in 0..source.len() {
            let result = self.transform(&Frame::new(source, &results, index));
            results.push(result);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_types::{Reusable, TimeValue};

    /// Running total of every value seen so far.
    struct Total;

    impl Algorithm<TimeValue> for Total {
        type Output = TimeValue;

        fn name(&self) -> String {
            "TOTAL".to_string()
        }

        fn min_cache_size(&self) -> usize {
            1
        }

        fn transform(&mut self, frame: &Frame<'_, TimeValue, TimeValue>) -> TimeValue {
            let prev = frame.previous().map_or(0.0, |r| r.value);
            TimeValue::new(frame.item().timestamp_ns, prev + frame.item().value().unwrap_or(0.0))
        }
    }

    fn points(n: i64) -> Vec<TimeValue> {
        (0..n).map(|i| TimeValue::new(i, i as f64)).collect()
    }

    #[test]
    fn test_frame_window() {
        let source = points(5);
        let results: Vec<TimeValue> = source[..3].to_vec();
        let frame = Frame::new(&source, &results, 3);

        assert_eq!(frame.item().timestamp_ns, 3);
        assert_eq!(frame.prior().map(|p| p.timestamp_ns), Some(2));
        assert_eq!(frame.window(2).map(<[TimeValue]>::len), Some(2));
        assert_eq!(frame.window(4).map(<[TimeValue]>::len), Some(4));
        assert!(frame.window(5).is_none());
        assert!(frame.window(0).is_none());
        assert_eq!(frame.history().len(), 4);
        assert_eq!(frame.prior_results(3).map(<[TimeValue]>::len), Some(3));
        assert!(frame.prior_results(4).is_none());
    }

    #[test]
    #[should_panic(expected = "result prefix misaligned")]
    fn test_frame_rejects_misaligned_results() {
        let source = points(3);
        let results: Vec<TimeValue> = Vec::new();
        let _ = Frame::new(&source, &results, 2);
    }

    #[test]
    fn test_default_recompute_folds_transform() {
        let source = points(4);
        let results = Total.recompute(&source);

        let totals: Vec<f64> = results.iter().map(|r| r.value).collect();
        assert_eq!(totals, vec![0.0, 1.0, 3.0, 6.0]);
        assert_eq!(Total.policy(), UpdatePolicy::Incremental);
    }
}
