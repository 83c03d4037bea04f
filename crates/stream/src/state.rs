//! Per-position state checkpoints.

use std::collections::VecDeque;

/// Private algorithm state recorded once per result position.
///
/// Kept aligned 1:1 with the hub's result cache: `truncate` on rollback,
/// `prune` on eviction. Rolling back is then O(1) and exact, which matters
/// for state that cannot be re-derived from prior results (running averages,
/// accumulated sums).
#[derive(Debug, Clone)]
pub struct StateLog<S> {
    entries: VecDeque<S>,
}

impl<S> Default for StateLog<S> {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }
}

impl<S> StateLog<S> {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the state after the newest position.
    pub fn push(&mut self, state: S) {
        self.entries.push_back(state);
    }

    /// State after the newest recorded position.
    #[must_use]
    pub fn last(&self) -> Option<&S> {
        self.entries.back()
    }

    /// State after position `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&S> {
        self.entries.get(index)
    }

    /// Forgets every position from `len` onward.
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Forgets the `count` oldest positions.
    pub fn prune(&mut self, count: usize) {
        let count = count.min(self.entries.len());
        self.entries.drain(..count);
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of recorded positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_restores_prior_state() {
        let mut log = StateLog::new();
        for i in 0..5 {
            log.push(i * 10);
        }

        log.truncate(3);
        assert_eq!(log.last(), Some(&20));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_prune_shifts_positions() {
        let mut log = StateLog::new();
        for i in 0..5 {
            log.push(i);
        }

        log.prune(2);
        assert_eq!(log.get(0), Some(&2));
        assert_eq!(log.len(), 3);

        log.prune(10);
        assert!(log.is_empty());
        assert!(log.last().is_none());
    }
}
