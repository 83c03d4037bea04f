//! Timestamp-ordered, timestamp-unique cache.

use strata_types::Series;

/// Result of a timestamp lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The timestamp is cached at this index.
    Exact(usize),
    /// The timestamp is absent; inserting it would land at this index.
    Vacant(usize),
}

impl Slot {
    /// Index of the match or the insertion point.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Slot::Exact(i) | Slot::Vacant(i) => i,
        }
    }
}

/// Position-indexed sequence with strictly increasing timestamps.
///
/// `pruned` counts items evicted from the front over the cache's lifetime, so
/// `pruned + index` is an item's position in the unbounded series.
#[derive(Debug, Clone)]
pub struct OrderedCache<T> {
    items: Vec<T>,
    pruned: usize,
}

impl<T> Default for OrderedCache<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pruned: 0,
        }
    }
}

impl<T: Series> OrderedCache<T> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached items, oldest first.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Number of cached items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of items evicted from the front.
    #[must_use]
    pub fn pruned(&self) -> usize {
        self.pruned
    }

    /// Item at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Most recent item.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    /// Binary-searches for `timestamp_ns`.
    #[must_use]
    pub fn locate(&self, timestamp_ns: i64) -> Slot {
        match self
            .items
            .binary_search_by_key(&timestamp_ns, |item| item.timestamp_ns())
        {
            Ok(i) => Slot::Exact(i),
            Err(i) => Slot::Vacant(i),
        }
    }

    /// Index of the item with exactly this timestamp.
    #[must_use]
    pub fn index_of(&self, timestamp_ns: i64) -> Option<usize> {
        match self.locate(timestamp_ns) {
            Slot::Exact(i) => Some(i),
            Slot::Vacant(_) => None,
        }
    }

    /// First index whose timestamp is on or after `timestamp_ns`.
    #[must_use]
    pub fn index_gte(&self, timestamp_ns: i64) -> Option<usize> {
        let i = self.locate(timestamp_ns).index();
        (i < self.items.len()).then_some(i)
    }

    /// Returns `true` if `timestamp_ns` is newer than every cached item.
    #[must_use]
    pub fn is_newer(&self, timestamp_ns: i64) -> bool {
        self.items
            .last()
            .is_none_or(|last| timestamp_ns > last.timestamp_ns())
    }

    /// Appends an item newer than the tail; returns its index.
    ///
    /// Callers must check [`Self::is_newer`] first.
    pub(crate) fn push(&mut self, item: T) -> usize {
        debug_assert!(self.is_newer(item.timestamp_ns()));
        self.items.push(item);
        self.items.len() - 1
    }

    /// Inserts at a vacant slot found by [`Self::locate`].
    pub(crate) fn insert(&mut self, index: usize, item: T) {
        debug_assert_eq!(self.locate(item.timestamp_ns()), Slot::Vacant(index));
        self.items.insert(index, item);
    }

    /// Replaces the item at `index` (same timestamp); returns the old item.
    pub(crate) fn replace(&mut self, index: usize, item: T) -> T {
        debug_assert_eq!(self.items[index].timestamp_ns(), item.timestamp_ns());
        std::mem::replace(&mut self.items[index], item)
    }

    /// Removes the item at `index`.
    pub(crate) fn remove(&mut self, index: usize) -> T {
        self.items.remove(index)
    }

    /// Drops every item from `len` onward.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    /// Evicts up to `count` oldest items; returns how many were evicted.
    pub(crate) fn prune_front(&mut self, count: usize) -> usize {
        let count = count.min(self.items.len());
        self.items.drain(..count);
        self.pruned += count;
        count
    }

    /// Removes every item and resets the eviction counter.
    pub fn clear(&mut self) {
        self.items.clear();
        self.pruned = 0;
    }
}

/// Returns `true` if timestamps strictly increase across `items`.
#[must_use]
pub fn is_strictly_ordered<T: Series>(items: &[T]) -> bool {
    items
        .windows(2)
        .all(|pair| pair[0].timestamp_ns() < pair[1].timestamp_ns())
}
