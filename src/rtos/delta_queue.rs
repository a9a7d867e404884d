//! Delta-encoded queue of pending deadlines.
//!
//! Each linked node stores its delay relative to its predecessor, so the
//! absolute number of ticks until node `i` fires is the sum of `delay` from
//! the head up to and including `i`. Advancing time only ever touches the
//! head, which keeps the per-tick work in interrupt context O(1) plus the
//! number of nodes that become due.
//!
//! The queue owns no storage: nodes live in the caller's fixed table and are
//! addressed by index.

/// Queue membership data embedded in every table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueLink {
    delay: u32,
    next: Option<usize>,
    queued: bool,
}

impl QueueLink {
    pub const UNLINKED: Self = Self {
        delay: 0,
        next: None,
        queued: false,
    };

    /// Delay relative to the predecessor. Meaningless when unlinked.
    #[inline]
    pub fn delay(&self) -> u32 {
        self.delay
    }

    #[inline]
    pub fn is_queued(&self) -> bool {
        self.queued
    }
}

impl Default for QueueLink {
    fn default() -> Self {
        Self::UNLINKED
    }
}

/// Anything that carries a [`QueueLink`].
pub trait QueueNode {
    fn link(&self) -> &QueueLink;
    fn link_mut(&mut self) -> &mut QueueLink;
}

impl QueueNode for QueueLink {
    fn link(&self) -> &QueueLink {
        self
    }

    fn link_mut(&mut self) -> &mut QueueLink {
        self
    }
}

/// Head of the delta chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeltaQueue {
    head: Option<usize>,
}

impl DeltaQueue {
    pub const fn new() -> Self {
        Self { head: None }
    }

    #[inline]
    pub fn head(&self) -> Option<usize> {
        self.head
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Link `id` so that it fires `delay` ticks from now.
    ///
    /// The walk passes over nodes whose relative delay equals the remaining
    /// budget, so a node lands after existing nodes with the same deadline.
    /// `id` must not already be linked.
    pub fn insert<N: QueueNode>(&mut self, nodes: &mut [N], id: usize, delay: u32) {
        debug_assert!(!nodes[id].link().queued, "node {} already queued", id);

        let mut remaining = delay;
        let mut prev: Option<usize> = None;
        let mut cur = self.head;

        while let Some(i) = cur {
            let link = nodes[i].link();
            if link.delay > remaining {
                break;
            }
            remaining -= link.delay;
            prev = Some(i);
            cur = link.next;
        }

        // Follower keeps its absolute deadline
        if let Some(next) = cur {
            nodes[next].link_mut().delay -= remaining;
        }

        *nodes[id].link_mut() = QueueLink {
            delay: remaining,
            next: cur,
            queued: true,
        };

        match prev {
            Some(p) => nodes[p].link_mut().next = Some(id),
            None => self.head = Some(id),
        }
    }

    /// Unlink `id`, handing its relative delay to its successor.
    ///
    /// Returns `false` if `id` was not linked; callers treat that as benign
    /// (the node may already have been popped as due).
    pub fn remove<N: QueueNode>(&mut self, nodes: &mut [N], id: usize) -> bool {
        if !nodes[id].link().queued {
            return false;
        }

        let mut prev: Option<usize> = None;
        let mut cur = self.head;
        while let Some(i) = cur {
            if i == id {
                break;
            }
            prev = Some(i);
            cur = nodes[i].link().next;
        }

        if cur != Some(id) {
            return false;
        }

        let QueueLink { delay, next, .. } = *nodes[id].link();
        if let Some(n) = next {
            let link = nodes[n].link_mut();
            link.delay = link.delay.saturating_add(delay);
        }

        match prev {
            Some(p) => nodes[p].link_mut().next = next,
            None => self.head = next,
        }

        *nodes[id].link_mut() = QueueLink::UNLINKED;
        true
    }

    /// Advance time by one tick.
    ///
    /// Decrements the head (never below zero), then unlinks every node at the
    /// front whose relative delay is zero and passes it to `on_due`. Returns
    /// the number of nodes popped.
    pub fn advance<N, F>(&mut self, nodes: &mut [N], mut on_due: F) -> usize
    where
        N: QueueNode,
        F: FnMut(usize, &mut N),
    {
        let Some(head) = self.head else {
            return 0;
        };

        let link = nodes[head].link_mut();
        link.delay = link.delay.saturating_sub(1);

        let mut popped = 0;
        while let Some(i) = self.head {
            let link = *nodes[i].link();
            if link.delay != 0 {
                break;
            }
            self.head = link.next;
            *nodes[i].link_mut() = QueueLink::UNLINKED;
            on_due(i, &mut nodes[i]);
            popped += 1;
        }
        popped
    }

    /// Walk the chain in firing order, yielding `(index, absolute_ticks)`.
    pub fn iter<'n, N: QueueNode>(&self, nodes: &'n [N]) -> Iter<'n, N> {
        Iter {
            nodes,
            cur: self.head,
            elapsed: 0,
        }
    }
}

/// Iterator over a [`DeltaQueue`] in firing order.
pub struct Iter<'n, N> {
    nodes: &'n [N],
    cur: Option<usize>,
    elapsed: u32,
}

impl<'n, N: QueueNode> Iterator for Iter<'n, N> {
    type Item = (usize, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.cur?;
        let link = self.nodes[i].link();
        self.elapsed = self.elapsed.saturating_add(link.delay);
        self.cur = link.next;
        Some((i, self.elapsed))
    }
}
