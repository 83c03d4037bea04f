//! Subscription edges and mutation fan-out.
//!
//! A publisher owns its subscribers and hands them its own cache slice with
//! every signal. Observers never reach back into their upstream during a
//! cascade, so a single mutable borrow per node is enough for the whole
//! depth-first walk.

use std::cell::RefCell;
use std::rc::Rc;

use strata_types::Series;

use crate::algorithm::Algorithm;
use crate::config::StreamConfig;
use crate::hub::Hub;
use crate::retention::RetentionNode;

/// Downstream end of a subscription.
pub trait Observer<T>: RetentionNode {
    /// `source[index]` was appended at the tail.
    fn on_add(&mut self, source: &[T], index: usize);

    /// Every position from `from` onward may have changed.
    fn on_rebuild(&mut self, source: &[T], from: usize);

    /// The `count` oldest upstream positions were evicted.
    fn on_prune(&mut self, count: usize);

    /// The upstream stopped publishing and dropped this subscription;
    /// `source` is its final state.
    fn on_completed(&mut self, source: &[T]);
}

/// Upstream end of a subscription.
pub trait Publisher<T>: RetentionNode {
    /// Retained items, oldest first.
    fn cache(&self) -> &[T];

    /// Settings inherited by new subscribers.
    fn config(&self) -> StreamConfig;

    /// Registers a subscriber.
    fn attach(&mut self, observer: Rc<RefCell<dyn Observer<T>>>) -> SubscriberId;

    /// Removes a subscriber; returns `false` if it was not attached.
    fn detach(&mut self, id: SubscriberId) -> bool;

    /// Brings a lazily rebuilt cache up to date.
    fn flush(&mut self) {}
}

/// Handle identifying one subscription on its publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Subscriber registry owned by a publisher.
pub struct Subscribers<T> {
    next_id: u64,
    entries: Vec<(SubscriberId, Rc<RefCell<dyn Observer<T>>>)>,
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<T> std::fmt::Debug for Subscribers<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.entries.len())
            .finish()
    }
}

impl<T> Subscribers<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attached subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers `observer` and returns its id.
    pub fn attach(&mut self, observer: Rc<RefCell<dyn Observer<T>>>) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    /// Removes the subscriber with `id`.
    pub fn detach(&mut self, id: SubscriberId) -> Option<Rc<RefCell<dyn Observer<T>>>> {
        let pos = self.entries.iter().position(|(entry, _)| *entry == id)?;
        Some(self.entries.remove(pos).1)
    }

    /// Detaches everyone and tells each subscriber it was dropped.
    pub fn complete_all(&mut self, source: &[T]) {
        for (_, observer) in self.entries.drain(..) {
            observer.borrow_mut().on_completed(source);
        }
    }

    /// Largest aggregate requirement among subscribers, 0 if none.
    #[must_use]
    pub fn max_min_cache_size(&self) -> usize {
        self.entries
            .iter()
            .map(|(_, observer)| observer.borrow().min_cache_size())
            .max()
            .unwrap_or(0)
    }

    /// Fans out an append.
    pub fn notify_add(&self, source: &[T], index: usize) {
        for (_, observer) in &self.entries {
            observer.borrow_mut().on_add(source, index);
        }
    }

    /// Fans out a rollback from `from`.
    pub fn notify_rebuild(&self, source: &[T], from: usize) {
        for (_, observer) in &self.entries {
            observer.borrow_mut().on_rebuild(source, from);
        }
    }

    /// Fans out an eviction.
    pub fn notify_prune(&self, count: usize) {
        if count == 0 {
            return;
        }
        for (_, observer) in &self.entries {
            observer.borrow_mut().on_prune(count);
        }
    }
}

/// Anything a hub can subscribe to: the provider or another hub.
pub trait ChainProvider<T: Series + 'static> {
    /// Publishing side of this node.
    fn publisher(&self) -> Rc<RefCell<dyn Publisher<T>>>;

    /// Retention side of this node.
    fn retention_node(&self) -> Rc<RefCell<dyn RetentionNode>>;

    /// Attaches a new hub running `algorithm` over this node's output.
    ///
    /// The hub replays everything currently retained here before it starts
    /// receiving live signals.
    fn subscribe<A>(&self, algorithm: A) -> Hub<T, A>
    where
        A: Algorithm<T> + 'static,
        Self: Sized,
    {
        Hub::attach(self.publisher(), self.retention_node(), algorithm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retention::Retention;
    use strata_types::TimeValue;

    /// Records every signal it receives.
    #[derive(Default)]
    struct Recorder {
        log: Vec<String>,
        need: usize,
    }

    impl RetentionNode for Recorder {
        fn min_cache_size(&self) -> usize {
            self.need
        }

        fn refresh_retention(&mut self) -> Option<Rc<RefCell<dyn RetentionNode>>> {
            None
        }
    }

    impl Observer<TimeValue> for Recorder {
        fn on_add(&mut self, source: &[TimeValue], index: usize) {
            self.log.push(format!("add {index}/{}", source.len()));
        }

        fn on_rebuild(&mut self, source: &[TimeValue], from: usize) {
            self.log.push(format!("rebuild {from}/{}", source.len()));
        }

        fn on_prune(&mut self, count: usize) {
            self.log.push(format!("prune {count}"));
        }

        fn on_completed(&mut self, source: &[TimeValue]) {
            self.log.push(format!("completed {}", source.len()));
        }
    }

    #[test]
    fn test_fan_out_reaches_every_subscriber() {
        let a = Rc::new(RefCell::new(Recorder::default()));
        let b = Rc::new(RefCell::new(Recorder::default()));
        let mut subs: Subscribers<TimeValue> = Subscribers::new();
        subs.attach(a.clone());
        subs.attach(b.clone());

        let source = vec![TimeValue::new(1, 1.0), TimeValue::new(2, 2.0)];
        subs.notify_add(&source, 1);
        subs.notify_rebuild(&source, 0);
        subs.notify_prune(0);
        subs.notify_prune(1);

        for recorder in [&a, &b] {
            assert_eq!(
                recorder.borrow().log,
                vec!["add 1/2", "rebuild 0/2", "prune 1"]
            );
        }
    }

    #[test]
    fn test_detach_and_max_requirement() {
        let small = Rc::new(RefCell::new(Recorder {
            need: 5,
            ..Recorder::default()
        }));
        let large = Rc::new(RefCell::new(Recorder {
            need: 20,
            ..Recorder::default()
        }));
        let mut subs: Subscribers<TimeValue> = Subscribers::new();
        subs.attach(small);
        let id = subs.attach(large);

        let mut retention = Retention::new(0);
        retention.refresh(subs.max_min_cache_size());
        assert_eq!(retention.aggregate(), 20);

        assert!(subs.detach(id).is_some());
        assert!(subs.detach(id).is_none());
        retention.refresh(subs.max_min_cache_size());
        assert_eq!(retention.aggregate(), 5);
    }

    #[test]
    fn test_complete_all_empties_registry() {
        let a = Rc::new(RefCell::new(Recorder::default()));
        let mut subs: Subscribers<TimeValue> = Subscribers::new();
        subs.attach(a.clone());

        subs.complete_all(&[TimeValue::new(1, 1.0)]);

        assert!(subs.is_empty());
        assert_eq!(subs.max_min_cache_size(), 0);
        assert_eq!(a.borrow().log, vec!["completed 1"]);
    }
}
