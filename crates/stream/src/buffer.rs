//! Append-only incremental list with bounded memory.
//!
//! No upstream, no subscribers and no rollback: each `add` extends the
//! result list from private state, and the oldest results are dropped once
//! the list outgrows its capacity.

use std::marker::PhantomData;

use crate::config::DEFAULT_MAX_CACHE_SIZE;
use crate::error::StreamError;

/// An algorithm that can drive a [`BufferList`].
pub trait BufferAlgorithm<I> {
    /// Result type, one per added item.
    type Output;

    /// Display name including parameters.
    fn name(&self) -> String;

    /// Trailing results the algorithm reads back; pruning never goes below.
    fn lookback(&self) -> usize {
        0
    }

    /// Appends exactly one result for `item`.
    ///
    /// May also rewrite earlier entries, e.g. to mark a pattern confirmed by
    /// this item.
    fn push(&mut self, item: &I, results: &mut Vec<Self::Output>);

    /// The `count` oldest results were dropped; shift or forget any stored
    /// positions.
    fn prune(&mut self, count: usize) {
        let _ = count;
    }

    /// Forgets all private state.
    fn clear(&mut self);
}

/// Bounded list of results fed one item at a time.
#[derive(Debug, Clone)]
pub struct BufferList<I, A: BufferAlgorithm<I>> {
    algorithm: A,
    results: Vec<A::Output>,
    max_list_size: usize,
    pruned: usize,
    _input: PhantomData<fn(&I)>,
}

impl<I, A: BufferAlgorithm<I>> BufferList<I, A> {
    /// Creates an effectively unbounded list.
    #[must_use]
    pub fn new(algorithm: A) -> Self {
        Self {
            algorithm,
            results: Vec::new(),
            max_list_size: DEFAULT_MAX_CACHE_SIZE,
            pruned: 0,
            _input: PhantomData,
        }
    }

    /// Creates a list that keeps at most `max_list_size` results (or the
    /// algorithm's lookback, whichever is larger).
    ///
    /// # Errors
    /// Returns [`StreamError::InvalidConfig`] if `max_list_size` is 0.
    pub fn with_max_list_size(algorithm: A, max_list_size: usize) -> Result<Self, StreamError> {
        let mut list = Self::new(algorithm);
        list.set_max_list_size(max_list_size)?;
        Ok(list)
    }

    /// Changes the capacity and prunes immediately if needed.
    ///
    /// # Errors
    /// Returns [`StreamError::InvalidConfig`] if `max_list_size` is 0.
    pub fn set_max_list_size(&mut self, max_list_size: usize) -> Result<(), StreamError> {
        if max_list_size == 0 {
            return Err(StreamError::invalid_config("max_list_size must be > 0"));
        }
        self.max_list_size = max_list_size;
        self.prune_excess();
        Ok(())
    }

    /// Computes the result for `item` and appends it.
    pub fn add(&mut self, item: I) {
        let before = self.results.len();
        self.algorithm.push(&item, &mut self.results);
        debug_assert_eq!(self.results.len(), before + 1, "push must add one result");
        self.prune_excess();
    }

    /// Adds every item in order.
    pub fn add_batch(&mut self, items: impl IntoIterator<Item = I>) {
        for item in items {
            self.add(item);
        }
    }

    /// Drops all results and algorithm state.
    pub fn clear(&mut self) {
        self.results.clear();
        self.algorithm.clear();
        self.pruned = 0;
    }

    fn prune_excess(&mut self) {
        let keep = self.max_list_size.max(self.algorithm.lookback());
        let excess = self.results.len().saturating_sub(keep);
        if excess == 0 {
            return;
        }
        self.results.drain(..excess);
        self.algorithm.prune(excess);
        self.pruned += excess;
        tracing::trace!(list = %self.algorithm.name(), excess, "buffer pruned");
    }

    /// Retained results, oldest first.
    #[must_use]
    pub fn results(&self) -> &[A::Output] {
        &self.results
    }

    /// Number of retained results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` when nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Most recent result.
    #[must_use]
    pub fn last(&self) -> Option<&A::Output> {
        self.results.last()
    }

    /// Results dropped from the front since the last clear.
    #[must_use]
    pub fn pruned(&self) -> usize {
        self.pruned
    }

    /// Current capacity.
    #[must_use]
    pub fn max_list_size(&self) -> usize {
        self.max_list_size
    }

    /// The driving algorithm.
    #[must_use]
    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Emits a running count and remembers where the last even input landed.
    #[derive(Default)]
    struct EvenTracker {
        count: usize,
        last_even: Option<usize>,
    }

    impl BufferAlgorithm<u32> for EvenTracker {
        type Output = usize;

        fn name(&self) -> String {
            "EVEN".to_string()
        }

        fn lookback(&self) -> usize {
            3
        }

        fn push(&mut self, item: &u32, results: &mut Vec<usize>) {
            self.count += 1;
            if item % 2 == 0 {
                self.last_even = Some(results.len());
            }
            results.push(self.count);
        }

        fn prune(&mut self, count: usize) {
            self.last_even = self.last_even.and_then(|i| i.checked_sub(count));
        }

        fn clear(&mut self) {
            *self = Self::default();
        }
    }

    #[test]
    fn test_prune_keeps_newest() {
        let mut list = BufferList::with_max_list_size(EvenTracker::default(), 5).unwrap();
        list.add_batch(1..=12);

        assert_eq!(list.len(), 5);
        assert_eq!(list.results(), &[8, 9, 10, 11, 12]);
        assert_eq!(list.pruned(), 7);
        assert_eq!(list.last(), Some(&12));
    }

    #[test]
    fn test_lookback_floors_capacity() {
        let mut list = BufferList::with_max_list_size(EvenTracker::default(), 1).unwrap();
        list.add_batch(1..=10);

        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_prune_shifts_bookkeeping() {
        let mut list = BufferList::with_max_list_size(EvenTracker::default(), 4).unwrap();
        list.add_batch([2, 1, 1, 1]);
        assert_eq!(list.algorithm().last_even, Some(0));

        list.add(1);
        assert_eq!(list.algorithm().last_even, None);

        list.add(4);
        assert_eq!(list.algorithm().last_even, Some(3));
    }

    #[test]
    fn test_set_max_list_size_prunes_now() {
        let mut list = BufferList::new(EvenTracker::default());
        list.add_batch(1..=20);
        assert_eq!(list.len(), 20);

        list.set_max_list_size(8).unwrap();
        assert_eq!(list.len(), 8);
        assert!(list.set_max_list_size(0).is_err());
        assert_eq!(list.max_list_size(), 8);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut list = BufferList::with_max_list_size(EvenTracker::default(), 4).unwrap();
        list.add_batch(1..=10);
        list.clear();

        assert!(list.is_empty());
        assert_eq!(list.pruned(), 0);
        list.add(2);
        assert_eq!(list.results(), &[1]);
    }
}
