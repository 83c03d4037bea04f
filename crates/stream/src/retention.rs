//! Retention negotiation across a chain.
//!
//! Every node declares how much trailing upstream history it needs to
//! recompute after a rollback. The requirement a node exposes upward is the
//! maximum of its own and every subscriber's, so a provider never evicts
//! history something downstream still reads.

use std::cell::RefCell;
use std::rc::Rc;

/// A node that takes part in retention negotiation.
pub trait RetentionNode {
    /// Aggregate requirement: own plus every subscriber's.
    fn min_cache_size(&self) -> usize;

    /// Recomputes the aggregate from the current subscribers.
    ///
    /// Returns this node's upstream when the aggregate changed and the
    /// upstream has to be refreshed next.
    fn refresh_retention(&mut self) -> Option<Rc<RefCell<dyn RetentionNode>>>;
}

/// A node's own requirement and the aggregate it exposes upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Retention {
    own: usize,
    aggregate: usize,
}

impl Retention {
    /// Creates a retention whose aggregate starts at `own`.
    #[must_use]
    pub fn new(own: usize) -> Self {
        Self {
            own,
            aggregate: own,
        }
    }

    /// Requirement of this node's algorithm alone.
    #[must_use]
    pub fn own(&self) -> usize {
        self.own
    }

    /// Requirement exposed upstream.
    #[must_use]
    pub fn aggregate(&self) -> usize {
        self.aggregate
    }

    /// Folds in the largest subscriber requirement; returns `true` if the
    /// aggregate changed.
    pub fn refresh(&mut self, subscriber_max: usize) -> bool {
        let next = self.own.max(subscriber_max);
        let changed = next != self.aggregate;
        self.aggregate = next;
        changed
    }
}

/// Number of items a cache keeps after eviction.
#[must_use]
pub fn retained_len(max_cache_size: usize, min_cache_size: usize) -> usize {
    max_cache_size.max(min_cache_size)
}

/// Refreshes `node`, then each ancestor in turn, stopping at the first node
/// whose aggregate did not change.
///
/// Must not run during a mutation cascade.
pub fn propagate_retention(node: Rc<RefCell<dyn RetentionNode>>) {
    let mut next = Some(node);
    let mut hops = 0usize;
    while let Some(current) = next {
        next = current.borrow_mut().refresh_retention();
        hops += 1;
    }
    tracing::debug!(hops, "retention propagated");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Weak;

    /// Minimal node with a fixed set of child requirements.
    struct Node {
        retention: Retention,
        children: Vec<usize>,
        parent: Weak<RefCell<Node>>,
    }

    impl RetentionNode for Node {
        fn min_cache_size(&self) -> usize {
            self.retention.aggregate()
        }

        fn refresh_retention(&mut self) -> Option<Rc<RefCell<dyn RetentionNode>>> {
            let max = self.children.iter().copied().max().unwrap_or(0);
            if !self.retention.refresh(max) {
                return None;
            }
            let parent = self.parent.upgrade()?;
            Some(parent)
        }
    }

    #[test]
    fn test_refresh_reports_change() {
        let mut retention = Retention::new(5);
        assert!(!retention.refresh(3));
        assert_eq!(retention.aggregate(), 5);

        assert!(retention.refresh(12));
        assert_eq!(retention.aggregate(), 12);
        assert_eq!(retention.own(), 5);

        assert!(retention.refresh(0));
        assert_eq!(retention.aggregate(), 5);
    }

    #[test]
    fn test_retained_len_takes_larger() {
        assert_eq!(retained_len(50, 20), 50);
        assert_eq!(retained_len(10, 20), 20);
    }

    #[test]
    fn test_propagation_walks_upward() {
        let root = Rc::new(RefCell::new(Node {
            retention: Retention::new(0),
            children: Vec::new(),
            parent: Weak::new(),
        }));
        let mid = Rc::new(RefCell::new(Node {
            retention: Retention::new(4),
            children: vec![30],
            parent: Rc::downgrade(&root),
        }));
        root.borrow_mut().children.push(30);

        propagate_retention(mid.clone());

        assert_eq!(mid.borrow().min_cache_size(), 30);
        assert_eq!(root.borrow().min_cache_size(), 30);
    }
}
