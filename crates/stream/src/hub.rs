//! Transform node: one algorithm, one aligned result cache.

use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};

use strata_types::Series;

use crate::algorithm::{Algorithm, Frame, UpdatePolicy};
use crate::cache::OrderedCache;
use crate::chain::{ChainProvider, Observer, Publisher, SubscriberId, Subscribers};
use crate::config::{RepaintMode, StreamConfig};
use crate::error::StreamError;
use crate::repaint::{self, RepaintOutcome};
use crate::retention::{Retention, RetentionNode, propagate_retention};

/// Node state shared between the hub handle, its upstream and its subscribers.
struct HubCore<I: Series, A: Algorithm<I>> {
    algorithm: A,
    cache: OrderedCache<A::Output>,
    subscribers: Subscribers<A::Output>,
    retention: Retention,
    config: StreamConfig,
    upstream: Weak<RefCell<dyn Publisher<I>>>,
    upstream_retention: Weak<RefCell<dyn RetentionNode>>,
    subscription: Option<SubscriberId>,
    stale: bool,
}

impl<I: Series, A: Algorithm<I>> HubCore<I, A> {
    fn transform_at(&mut self, source: &[I], index: usize) {
        let result = self
            .algorithm
            .transform(&Frame::new(source, self.cache.as_slice(), index));
        self.cache.push(result);
    }

    /// Drops results from `from` onward and restores algorithm state;
    /// returns how many were dropped.
    fn truncate_from(&mut self, source: &[I], from: usize) -> usize {
        let from = from.min(self.cache.len());
        let removed = self.cache.len() - from;
        self.cache.truncate(from);
        self.algorithm.rollback(source, self.cache.as_slice());
        removed
    }

    /// Truncates to `from`, restores algorithm state and replays the rest of
    /// `source`.
    fn replay_from(&mut self, source: &[I], from: usize) {
        let from = from.min(self.cache.len());
        self.truncate_from(source, from);
        for index in from..source.len() {
            self.transform_at(source, index);
        }
    }

    fn repaint(&mut self, source: &[I]) {
        if self.config.repaint == RepaintMode::OnRead && self.subscribers.is_empty() {
            self.stale = true;
            return;
        }
        self.stale = false;
        let fresh = self.algorithm.recompute(source);
        match repaint::apply(&mut self.cache, fresh) {
            RepaintOutcome::Unchanged => {}
            RepaintOutcome::Appended(index) => {
                self.subscribers.notify_add(self.cache.as_slice(), index);
            }
            RepaintOutcome::Rebuilt(from) => {
                tracing::debug!(hub = %self.algorithm.name(), from, "repainted");
                self.subscribers.notify_rebuild(self.cache.as_slice(), from);
            }
        }
    }

    /// Runs a pending lazy repaint against `source`.
    fn settle(&mut self, source: &[I]) {
        if !self.stale {
            return;
        }
        self.stale = false;
        let fresh = self.algorithm.recompute(source);
        repaint::apply(&mut self.cache, fresh);
    }

    /// Initial fill from whatever the upstream retains.
    fn replay(&mut self, source: &[I]) {
        match self.algorithm.policy() {
            UpdatePolicy::Incremental => self.replay_from(source, 0),
            UpdatePolicy::Repaint => self.repaint(source),
        }
    }
}

impl<I: Series, A: Algorithm<I>> RetentionNode for HubCore<I, A> {
    fn min_cache_size(&self) -> usize {
        self.retention.aggregate()
    }

    fn refresh_retention(&mut self) -> Option<Rc<RefCell<dyn RetentionNode>>> {
        if self.retention.refresh(self.subscribers.max_min_cache_size()) {
            self.upstream_retention.upgrade()
        } else {
            None
        }
    }
}

impl<I: Series, A: Algorithm<I>> Observer<I> for HubCore<I, A> {
    fn on_add(&mut self, source: &[I], index: usize) {
        if self.algorithm.policy() == UpdatePolicy::Repaint {
            self.repaint(source);
            return;
        }
        if index != self.cache.len() {
            self.on_rebuild(source, index);
            return;
        }
        self.transform_at(source, index);
        tracing::trace!(hub = %self.algorithm.name(), index, "appended");
        self.subscribers.notify_add(self.cache.as_slice(), index);
    }

    fn on_rebuild(&mut self, source: &[I], from: usize) {
        if self.algorithm.policy() == UpdatePolicy::Repaint {
            self.repaint(source);
            return;
        }
        let from = from.min(self.cache.len());
        self.replay_from(source, from);
        tracing::debug!(hub = %self.algorithm.name(), from, len = self.cache.len(), "rebuilt");
        self.subscribers.notify_rebuild(self.cache.as_slice(), from);
    }

    fn on_prune(&mut self, count: usize) {
        let count = self.cache.prune_front(count);
        self.algorithm.prune(count);
        self.subscribers.notify_prune(count);
    }

    fn on_completed(&mut self, source: &[I]) {
        tracing::debug!(hub = %self.algorithm.name(), "upstream completed");
        self.settle(source);
        self.subscription = None;
        self.subscribers.complete_all(self.cache.as_slice());
        self.retention.refresh(0);
    }
}

impl<I: Series, A: Algorithm<I>> Publisher<A::Output> for HubCore<I, A> {
    fn cache(&self) -> &[A::Output] {
        self.cache.as_slice()
    }

    fn config(&self) -> StreamConfig {
        self.config.clone()
    }

    fn attach(&mut self, observer: Rc<RefCell<dyn Observer<A::Output>>>) -> SubscriberId {
        self.subscribers.attach(observer)
    }

    fn detach(&mut self, id: SubscriberId) -> bool {
        self.subscribers.detach(id).is_some()
    }

    fn flush(&mut self) {
        if !self.stale || self.subscription.is_none() {
            return;
        }
        let Some(upstream) = self.upstream.upgrade() else {
            return;
        };
        let source = upstream.borrow();
        self.settle(source.cache());
    }
}

/// Handle to a transform node subscribed to a provider or another hub.
///
/// Cloning the handle shares the node. Dropping every handle does not
/// unsubscribe: the upstream keeps the node alive until [`Hub::unsubscribe`]
/// or the upstream's end of transmission.
pub struct Hub<I: Series, A: Algorithm<I>> {
    core: Rc<RefCell<HubCore<I, A>>>,
}

impl<I: Series, A: Algorithm<I>> Clone for Hub<I, A> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<I: Series + 'static, A: Algorithm<I> + 'static> Hub<I, A> {
    pub(crate) fn attach(
        publisher: Rc<RefCell<dyn Publisher<I>>>,
        retention: Rc<RefCell<dyn RetentionNode>>,
        algorithm: A,
    ) -> Self {
        let config = publisher.borrow().config();
        let name = algorithm.name();

        let core = Rc::new(RefCell::new(HubCore {
            retention: Retention::new(algorithm.min_cache_size()),
            algorithm,
            cache: OrderedCache::new(),
            subscribers: Subscribers::new(),
            config,
            upstream: Rc::downgrade(&publisher),
            upstream_retention: Rc::downgrade(&retention),
            subscription: None,
            stale: false,
        }));

        Self::connect(&core, &publisher, retention);

        tracing::debug!(hub = %name, len = core.borrow().cache.len(), "subscribed");
        Self { core }
    }

    /// Replays the upstream's retained history, then registers as its
    /// subscriber.
    fn connect(
        core: &Rc<RefCell<HubCore<I, A>>>,
        publisher: &Rc<RefCell<dyn Publisher<I>>>,
        retention: Rc<RefCell<dyn RetentionNode>>,
    ) {
        publisher.borrow_mut().flush();
        core.borrow_mut().replay(publisher.borrow().cache());
        let observer: Rc<RefCell<dyn Observer<I>>> = core.clone();
        let id = publisher.borrow_mut().attach(observer);
        core.borrow_mut().subscription = Some(id);
        propagate_retention(retention);
    }

    /// Upstream of a subscribed hub.
    fn connected_upstream(&self) -> Result<Rc<RefCell<dyn Publisher<I>>>, StreamError> {
        let core = self.core.borrow();
        if core.subscription.is_none() {
            return Err(StreamError::Detached(core.algorithm.name()));
        }
        core.upstream
            .upgrade()
            .ok_or_else(|| StreamError::UpstreamDropped(core.algorithm.name()))
    }

    /// Current results, rebuilt first if a lazy repaint is pending.
    ///
    /// The pending rebuild waits while another borrow of these results is
    /// still alive.
    pub fn results(&self) -> Ref<'_, [A::Output]> {
        let stale = self.core.borrow().stale;
        if stale && let Ok(mut core) = self.core.try_borrow_mut() {
            core.flush();
        }
        Ref::map(self.core.borrow(), |core| core.cache.as_slice())
    }

    /// Number of cached results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results().len()
    }

    /// Returns `true` when no results are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results().is_empty()
    }

    /// Result at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<A::Output> {
        self.results().get(index).cloned()
    }

    /// Most recent result.
    #[must_use]
    pub fn last(&self) -> Option<A::Output> {
        self.results().last().cloned()
    }

    /// Algorithm display name.
    #[must_use]
    pub fn name(&self) -> String {
        self.core.borrow().algorithm.name()
    }

    /// Aggregate retention requirement of this hub and its subscribers.
    #[must_use]
    pub fn min_cache_size(&self) -> usize {
        self.core.borrow().retention.aggregate()
    }

    /// Number of direct subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.core.borrow().subscribers.len()
    }

    /// Total results evicted from the front.
    #[must_use]
    pub fn pruned(&self) -> usize {
        self.core.borrow().cache.pruned()
    }

    /// Returns `true` while attached to an upstream.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.core.borrow().subscription.is_some()
    }

    /// Runs `f` against the algorithm.
    pub fn with_algorithm<R>(&self, f: impl FnOnce(&A) -> R) -> R {
        f(&self.core.borrow().algorithm)
    }

    /// Detaches from the upstream and renegotiates its retention.
    ///
    /// Results stay readable but no longer follow the upstream. Returns
    /// `Ok(false)` if already detached.
    ///
    /// # Errors
    /// Returns [`StreamError::UpstreamDropped`] if the upstream no longer
    /// exists.
    pub fn unsubscribe(&self) -> Result<bool, StreamError> {
        let (id, publisher, retention) = {
            let mut core = self.core.borrow_mut();
            let Some(id) = core.subscription.take() else {
                return Ok(false);
            };
            (id, core.upstream.upgrade(), core.upstream_retention.upgrade())
        };
        let (Some(publisher), Some(retention)) = (publisher, retention) else {
            return Err(StreamError::UpstreamDropped(self.name()));
        };

        {
            let source = publisher.borrow();
            self.core.borrow_mut().settle(source.cache());
        }
        let detached = publisher.borrow_mut().detach(id);
        propagate_retention(retention);
        tracing::debug!(hub = %self.name(), detached, "unsubscribed");
        Ok(detached)
    }

    /// Recomputes every result from the upstream's retained history.
    ///
    /// # Errors
    /// Returns [`StreamError::Detached`] if the hub is not subscribed and
    /// [`StreamError::UpstreamDropped`] if its upstream no longer exists.
    pub fn rebuild(&self) -> Result<(), StreamError> {
        self.rebuild_at(0)
    }

    /// Recomputes results from the first position at or after
    /// `timestamp_ns`; subscribers follow from the same position.
    ///
    /// # Errors
    /// Same as [`Hub::rebuild`].
    pub fn rebuild_from(&self, timestamp_ns: i64) -> Result<(), StreamError> {
        let from = self.position_from(timestamp_ns);
        self.rebuild_at(from)
    }

    /// Recomputes results from position `from`.
    ///
    /// # Errors
    /// Same as [`Hub::rebuild`].
    pub fn rebuild_at(&self, from: usize) -> Result<(), StreamError> {
        let publisher = self.connected_upstream()?;
        let source = publisher.borrow();
        self.core.borrow_mut().on_rebuild(source.cache(), from);
        Ok(())
    }

    /// Drops every result at or after `timestamp_ns` and rolls the
    /// algorithm back to match; returns how many were dropped.
    ///
    /// Subscribers truncate from the same position. The gap is refilled by
    /// the next upstream signal or by [`Hub::rebuild`].
    ///
    /// # Errors
    /// Same as [`Hub::rebuild`].
    pub fn remove_range(&self, timestamp_ns: i64) -> Result<usize, StreamError> {
        let publisher = self.connected_upstream()?;
        let source = publisher.borrow();
        let mut core = self.core.borrow_mut();
        let core = &mut *core;
        core.settle(source.cache());

        let from = core.cache.index_gte(timestamp_ns).unwrap_or(core.cache.len());
        let removed = core.truncate_from(source.cache(), from);
        if removed > 0 {
            tracing::debug!(hub = %core.algorithm.name(), from, removed, "range removed");
            core.subscribers.notify_rebuild(core.cache.as_slice(), from);
        }
        Ok(removed)
    }

    /// Detaches, discards every result and all algorithm state, then
    /// resubscribes to the same upstream and replays what it retains.
    ///
    /// Works on a detached hub too. Subscribers rebuild from position 0.
    ///
    /// # Errors
    /// Returns [`StreamError::UpstreamDropped`] if the upstream no longer
    /// exists; the hub is left untouched.
    pub fn reinitialize(&self) -> Result<(), StreamError> {
        let (publisher, retention, subscription) = {
            let mut core = self.core.borrow_mut();
            let (Some(publisher), Some(retention)) =
                (core.upstream.upgrade(), core.upstream_retention.upgrade())
            else {
                return Err(StreamError::UpstreamDropped(core.algorithm.name()));
            };
            (publisher, retention, core.subscription.take())
        };
        if let Some(id) = subscription {
            publisher.borrow_mut().detach(id);
        }
        {
            let mut core = self.core.borrow_mut();
            core.stale = false;
            core.cache.clear();
            core.algorithm.rollback(&[], &[]);
        }

        Self::connect(&self.core, &publisher, retention);

        let mut core = self.core.borrow_mut();
        let core = &mut *core;
        tracing::debug!(hub = %core.algorithm.name(), len = core.cache.len(), "reinitialized");
        core.subscribers.notify_rebuild(core.cache.as_slice(), 0);
        Ok(())
    }

    fn position_from(&self, timestamp_ns: i64) -> usize {
        let core = self.core.borrow();
        core.cache.index_gte(timestamp_ns).unwrap_or(core.cache.len())
    }
}

impl<I: Series + 'static, A: Algorithm<I> + 'static> ChainProvider<A::Output> for Hub<I, A> {
    fn publisher(&self) -> Rc<RefCell<dyn Publisher<A::Output>>> {
        self.core.clone()
    }

    fn retention_node(&self) -> Rc<RefCell<dyn RetentionNode>> {
        self.core.clone()
    }
}

impl<I: Series, A: Algorithm<I>> std::fmt::Debug for Hub<I, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.core.try_borrow() {
            Ok(core) => f
                .debug_struct("Hub")
                .field("name", &core.algorithm.name())
                .field("len", &core.cache.len())
                .field("min_cache_size", &core.retention.aggregate())
                .field("subscribers", &core.subscribers.len())
                .finish(),
            Err(_) => f.write_str("Hub { <borrowed> }"),
        }
    }
}
