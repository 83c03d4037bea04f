//! Root node: accepts raw events and publishes them down the chain.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use strata_types::{Quote, Series};

use crate::cache::{OrderedCache, Slot};
use crate::chain::{ChainProvider, Observer, Publisher, SubscriberId, Subscribers};
use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::retention::{Retention, RetentionNode, retained_len};

/// Why a mutation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The position is inside the history subscribers depend on.
    BelowRetentionFloor {
        /// Position the mutation would have touched
        index: usize,
        /// Aggregate `min_cache_size` at the time
        floor: usize,
    },
    /// The timestamp predates the oldest retained item after eviction.
    BeforeTimeline {
        /// Rejected timestamp
        timestamp_ns: i64,
    },
}

/// Outcome of a provider mutation.
///
/// Anything but `Unchanged`, `NotFound` and `Rejected` was applied and
/// cascaded to every subscriber before the call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// New tail item.
    Appended {
        /// Position of the new item
        index: usize,
    },
    /// Ordered insert before the tail.
    Inserted {
        /// Position of the new item
        index: usize,
    },
    /// Existing timestamp replaced with a different value.
    Revised {
        /// Position of the revised item
        index: usize,
    },
    /// Item removed.
    Removed {
        /// Former position of the item
        index: usize,
    },
    /// Identical item already cached.
    Unchanged,
    /// Nothing cached at that timestamp or position.
    NotFound,
    /// Refused; the cache is untouched.
    Rejected(Rejection),
}

impl Mutation {
    /// Returns `true` if the cache changed.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(
            self,
            Mutation::Appended { .. }
                | Mutation::Inserted { .. }
                | Mutation::Revised { .. }
                | Mutation::Removed { .. }
        )
    }
}

struct ProviderCore<T> {
    cache: OrderedCache<T>,
    subscribers: Subscribers<T>,
    retention: Retention,
    config: StreamConfig,
}

impl<T: Series + Clone + PartialEq> ProviderCore<T> {
    fn add(&mut self, item: T) -> Mutation {
        if !self.cache.is_newer(item.timestamp_ns()) {
            return self.insert(item);
        }
        let index = self.cache.push(item);
        tracing::trace!(index, "provider append");
        self.subscribers.notify_add(self.cache.as_slice(), index);
        self.prune_excess();
        Mutation::Appended { index }
    }

    fn insert(&mut self, item: T) -> Mutation {
        let timestamp_ns = item.timestamp_ns();
        let slot = self.cache.locate(timestamp_ns);

        if let Slot::Exact(index) = slot
            && self.cache.get(index) == Some(&item)
        {
            return Mutation::Unchanged;
        }
        if let Some(rejection) = self.check_floor(slot, timestamp_ns) {
            return reject(rejection);
        }

        match slot {
            Slot::Exact(index) => {
                self.cache.replace(index, item);
                self.subscribers.notify_rebuild(self.cache.as_slice(), index);
                Mutation::Revised { index }
            }
            Slot::Vacant(index) => {
                self.cache.insert(index, item);
                self.subscribers.notify_rebuild(self.cache.as_slice(), index);
                self.prune_excess();
                Mutation::Inserted { index }
            }
        }
    }

    fn remove_at(&mut self, index: usize) -> Mutation {
        let Some(timestamp_ns) = self.cache.get(index).map(|item| item.timestamp_ns()) else {
            return Mutation::NotFound;
        };
        if let Some(rejection) = self.check_floor(Slot::Exact(index), timestamp_ns) {
            return reject(rejection);
        }
        self.cache.remove(index);
        self.subscribers.notify_rebuild(self.cache.as_slice(), index);
        Mutation::Removed { index }
    }

    fn check_floor(&self, slot: Slot, timestamp_ns: i64) -> Option<Rejection> {
        if slot == Slot::Vacant(0) && self.cache.pruned() > 0 {
            return Some(Rejection::BeforeTimeline { timestamp_ns });
        }
        let index = slot.index();
        let floor = self.retention.aggregate();
        (index < floor).then_some(Rejection::BelowRetentionFloor { index, floor })
    }

    fn prune_excess(&mut self) {
        let keep = retained_len(self.config.max_cache_size, self.retention.aggregate());
        let excess = self.cache.len().saturating_sub(keep);
        if excess == 0 {
            return;
        }
        let count = self.cache.prune_front(excess);
        tracing::debug!(count, pruned = self.cache.pruned(), "provider evicted");
        self.subscribers.notify_prune(count);
    }
}

fn reject(rejection: Rejection) -> Mutation {
    tracing::warn!(?rejection, "mutation rejected");
    Mutation::Rejected(rejection)
}

impl<T: Series> RetentionNode for ProviderCore<T> {
    fn min_cache_size(&self) -> usize {
        self.retention.aggregate()
    }

    fn refresh_retention(&mut self) -> Option<Rc<RefCell<dyn RetentionNode>>> {
        self.retention.refresh(self.subscribers.max_min_cache_size());
        None
    }
}

impl<T: Series> Publisher<T> for ProviderCore<T> {
    fn cache(&self) -> &[T] {
        self.cache.as_slice()
    }

    fn config(&self) -> StreamConfig {
        self.config.clone()
    }

    fn attach(&mut self, observer: Rc<RefCell<dyn Observer<T>>>) -> SubscriberId {
        self.subscribers.attach(observer)
    }

    fn detach(&mut self, id: SubscriberId) -> bool {
        self.subscribers.detach(id).is_some()
    }
}

/// Root of a chain: an ordered event cache with subscribers.
///
/// Every mutation resolves the whole downstream graph before returning.
pub struct StreamProvider<T> {
    core: Rc<RefCell<ProviderCore<T>>>,
}

/// Provider of OHLCV quotes.
pub type QuoteHub = StreamProvider<Quote>;

impl<T> Clone for StreamProvider<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: Series + Clone + PartialEq + 'static> Default for StreamProvider<T> {
    fn default() -> Self {
        Self::from_valid_config(StreamConfig::default())
    }
}

impl<T: Series + Clone + PartialEq + 'static> StreamProvider<T> {
    /// Creates a provider with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider with a validated configuration.
    ///
    /// # Errors
    /// Returns [`StreamError::InvalidConfig`] if `config` is out of range.
    pub fn with_config(config: StreamConfig) -> Result<Self, StreamError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    /// Creates a provider that evicts beyond `max_cache_size` items.
    ///
    /// # Errors
    /// Returns [`StreamError::InvalidConfig`] if `max_cache_size` is out of range.
    pub fn with_max_cache_size(max_cache_size: usize) -> Result<Self, StreamError> {
        Self::with_config(StreamConfig::with_max_cache_size(max_cache_size)?)
    }

    fn from_valid_config(config: StreamConfig) -> Self {
        Self {
            core: Rc::new(RefCell::new(ProviderCore {
                cache: OrderedCache::new(),
                subscribers: Subscribers::new(),
                retention: Retention::new(0),
                config,
            })),
        }
    }

    /// Appends `item`, or inserts it if it is not newer than the tail.
    pub fn add(&self, item: T) -> Mutation {
        self.core.borrow_mut().add(item)
    }

    /// Sorts `items` by timestamp and adds each in turn.
    pub fn add_batch(&self, items: impl IntoIterator<Item = T>) -> Vec<Mutation> {
        let mut items: Vec<T> = items.into_iter().collect();
        items.sort_by_key(|item| item.timestamp_ns());
        let mut core = self.core.borrow_mut();
        items.into_iter().map(|item| core.add(item)).collect()
    }

    /// Inserts `item` at its ordered position; a cached timestamp is revised.
    pub fn insert(&self, item: T) -> Mutation {
        self.core.borrow_mut().insert(item)
    }

    /// Removes the item with exactly `timestamp_ns`.
    pub fn remove(&self, timestamp_ns: i64) -> Mutation {
        let mut core = self.core.borrow_mut();
        match core.cache.index_of(timestamp_ns) {
            Some(index) => core.remove_at(index),
            None => Mutation::NotFound,
        }
    }

    /// Removes the item at `index`.
    pub fn remove_at(&self, index: usize) -> Mutation {
        self.core.borrow_mut().remove_at(index)
    }

    /// Detaches every subscriber, recursively, and resets retention.
    ///
    /// Cached events stay in place and the provider keeps accepting events.
    pub fn end_transmission(&self) {
        let mut core = self.core.borrow_mut();
        let core = &mut *core;
        tracing::debug!(subscribers = core.subscribers.len(), "end of transmission");
        core.subscribers.complete_all(core.cache.as_slice());
        core.retention.refresh(0);
    }

    /// Retained events, oldest first.
    pub fn results(&self) -> Ref<'_, [T]> {
        Ref::map(self.core.borrow(), |core| core.cache.as_slice())
    }

    /// Number of retained events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.borrow().cache.len()
    }

    /// Returns `true` when nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.borrow().cache.is_empty()
    }

    /// Event at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        self.core.borrow().cache.get(index).cloned()
    }

    /// Most recent event.
    #[must_use]
    pub fn last(&self) -> Option<T> {
        self.core.borrow().cache.last().cloned()
    }

    /// Index of the event with exactly `timestamp_ns`.
    #[must_use]
    pub fn index_of(&self, timestamp_ns: i64) -> Option<usize> {
        self.core.borrow().cache.index_of(timestamp_ns)
    }

    /// Aggregate retention floor requested by subscribers.
    #[must_use]
    pub fn min_cache_size(&self) -> usize {
        self.core.borrow().retention.aggregate()
    }

    /// Number of direct subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.core.borrow().subscribers.len()
    }

    /// Total events evicted from the front.
    #[must_use]
    pub fn pruned(&self) -> usize {
        self.core.borrow().cache.pruned()
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> StreamConfig {
        self.core.borrow().config.clone()
    }
}

impl<T: Series + Clone + PartialEq + 'static> ChainProvider<T> for StreamProvider<T> {
    fn publisher(&self) -> Rc<RefCell<dyn Publisher<T>>> {
        self.core.clone()
    }

    fn retention_node(&self) -> Rc<RefCell<dyn RetentionNode>> {
        self.core.clone()
    }
}

impl<T: Series> std::fmt::Debug for StreamProvider<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.core.try_borrow() {
            Ok(core) => f
                .debug_struct("StreamProvider")
                .field("len", &core.cache.len())
                .field("min_cache_size", &core.retention.aggregate())
                .field("subscribers", &core.subscribers.len())
                .finish(),
            Err(_) => f.write_str("StreamProvider { <borrowed> }"),
        }
    }
}
