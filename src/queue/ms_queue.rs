//! The Michael-Scott lock-free queue.
//!
//! Maged M. Michael and Michael L. Scott, "Simple, Fast, and Practical
//! Non-Blocking and Blocking Concurrent Queue Algorithms", PODC 1996.
//!
//! The chain always starts with a dummy node whose element has already been
//! taken. `head` points at the dummy, `tail` at the last node or the one just
//! before it. Enqueue links a node after the last one and then swings `tail`;
//! dequeue swings `head` to the dummy's successor, which becomes the new dummy.
//! Any thread that sees `tail` lagging advances it before retrying.
//!
//! Nodes are freed through a per-queue hazard-pointer [`Domain`]: every node
//! is protected before it is dereferenced or compared, so an address can never
//! be recycled under a pending compare-and-swap.

use core::fmt;
use core::marker::PhantomData;
use core::ptr;

use crossbeam_utils::CachePadded;

use super::invariant::InvariantViolation;
use super::node::Node;
use crate::atomic::AtomicSlot;
use crate::reclaim::{Domain, ReclaimConfig, ReclaimStats};
use crate::sync::{warn_event, Backoff, Ordering};

/// Hazard index for `head` (dequeue) or `tail` (enqueue).
const HAZARD_ANCHOR: usize = 0;
/// Hazard index for the successor of `head`.
const HAZARD_NEXT: usize = 1;

/// An unbounded, lock-free, multi-producer multi-consumer FIFO queue.
///
/// # Examples
///
/// ```rust
/// use msqueue::MsQueue;
///
/// let queue = MsQueue::new();
/// queue.enqueue(1);
/// queue.enqueue(2);
/// assert_eq!(queue.dequeue(), Some(1));
/// assert_eq!(queue.dequeue(), Some(2));
/// assert_eq!(queue.dequeue(), None);
/// ```
///
/// Sharing across threads needs no extra synchronization:
///
/// ```rust
/// use msqueue::MsQueue;
/// use std::thread;
///
/// let queue = MsQueue::new();
/// thread::scope(|s| {
///     for t in 0..4 {
///         let queue = &queue;
///         s.spawn(move || {
///             for i in 0..100 {
///                 queue.enqueue(t * 100 + i);
///             }
///         });
///     }
/// });
///
/// let mut drained: Vec<_> = std::iter::from_fn(|| queue.dequeue()).collect();
/// drained.sort_unstable();
/// assert_eq!(drained, (0..400).collect::<Vec<_>>());
/// ```
pub struct MsQueue<T> {
    head: CachePadded<AtomicSlot<Node<T>>>,
    tail: CachePadded<AtomicSlot<Node<T>>>,
    domain: Domain,
    _owns: PhantomData<T>,
}

// SAFETY: elements move between threads through the queue, and a node's
// element is only ever accessed by one thread at a time (the enqueuer before
// publication, the winning dequeuer after its head CAS).
unsafe impl<T: Send> Send for MsQueue<T> {}
unsafe impl<T: Send> Sync for MsQueue<T> {}

impl<T> MsQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::with_config(ReclaimConfig::default())
    }

    /// Creates an empty queue whose reclamation domain uses `config`.
    pub fn with_config(config: ReclaimConfig) -> Self {
        let dummy = Node::dummy();
        Self {
            head: CachePadded::new(AtomicSlot::new(dummy)),
            tail: CachePadded::new(AtomicSlot::new(dummy)),
            domain: Domain::with_config(config),
            _owns: PhantomData,
        }
    }

    /// Appends `element` at the back of the queue.
    ///
    /// Never fails. Under contention the call retries, and while doing so it
    /// may advance a `tail` left behind by another enqueuer.
    pub fn enqueue(&self, element: T) {
        let node = Node::with_element(element);
        let guard = self.domain.acquire();
        let backoff = Backoff::new();

        loop {
            let tail = guard.protect(HAZARD_ANCHOR, &self.tail);
            // SAFETY: `tail` is never null and is protected by the guard.
            let next = unsafe { (*tail).next.load_acquire() };
            if tail != self.tail.load_acquire() {
                continue;
            }

            if !next.is_null() {
                // Finish a slower enqueuer's second step, then start over
                // whether or not this CAS won.
                self.tail.cas(tail, next);
                continue;
            }

            // SAFETY: as above.
            if unsafe { (*tail).next.cas(ptr::null_mut(), node) } {
                // Linearized. A failure here means someone already helped.
                self.tail.cas(tail, node);
                return;
            }
            backoff.spin();
        }
    }

    /// Removes and returns the element at the front of the queue, or `None`
    /// if the queue was empty.
    pub fn dequeue(&self) -> Option<T> {
        let guard = self.domain.acquire();
        let backoff = Backoff::new();

        loop {
            let head = guard.protect(HAZARD_ANCHOR, &self.head);
            let tail = self.tail.load_acquire();
            // SAFETY: `head` is never null and is protected by the guard.
            let next = unsafe { (*head).next.load_acquire() };
            guard.publish(HAZARD_NEXT, next);
            // Still the head means `next` was still linked when published.
            if head != self.head.load_acquire() {
                continue;
            }

            if head == tail {
                if next.is_null() {
                    return None;
                }
                self.tail.cas(tail, next);
                continue;
            }

            if next.is_null() {
                // Only reachable through a torn snapshot; re-read.
                continue;
            }

            if self.head.cas(head, next) {
                // SAFETY: the CAS made `next` the new dummy and this thread
                // the sole owner of its element; `next` is protected.
                let element = unsafe { (*(*next).element.get()).take() };
                guard.clear(HAZARD_NEXT);
                guard.clear(HAZARD_ANCHOR);
                // SAFETY: `head` was unlinked by the CAS above, exactly once.
                unsafe { guard.retire(head) };
                return element;
            }
            backoff.spin();
        }
    }

    /// Returns `true` if the queue was empty at the moment of the check.
    ///
    /// The answer may be stale by the time it is used.
    pub fn is_empty(&self) -> bool {
        let guard = self.domain.acquire();
        let head = guard.protect(HAZARD_ANCHOR, &self.head);
        // SAFETY: protected, never null.
        unsafe { (*head).next.is_null(Ordering::Acquire) }
    }

    /// Checks the structural invariants that must hold at rest.
    ///
    /// Taking `&mut self` guarantees no operation is in flight.
    ///
    /// # Errors
    /// Returns the first violated invariant: `tail` must be the last node,
    /// and the dummy at `head` must hold no element.
    pub fn validate(&mut self) -> Result<(), InvariantViolation> {
        let tail = self.tail.load(Ordering::Acquire);
        // SAFETY: exclusive access; `tail` is a live node.
        if unsafe { !(*tail).next.is_null(Ordering::Acquire) } {
            warn_event!("validate: tail is not the last node");
            return Err(InvariantViolation::TailNotLast);
        }

        let head = self.head.load(Ordering::Acquire);
        // SAFETY: exclusive access; `head` is a live node.
        if unsafe { (*(*head).element.get()).is_some() } {
            warn_event!("validate: dummy node holds an element");
            return Err(InvariantViolation::DummyHoldsElement);
        }
        Ok(())
    }

    /// Frees every retired node no thread is still reading.
    ///
    /// Retired nodes are otherwise freed in batches as operations run, or when
    /// the queue drops.
    pub fn flush(&self) {
        self.domain.flush();
    }

    /// Counters of the queue's reclamation domain.
    pub fn reclaim_stats(&self) -> ReclaimStats {
        self.domain.stats()
    }
}

impl<T> Default for MsQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Extend<T> for MsQueue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for element in iter {
            self.enqueue(element);
        }
    }
}

impl<T> FromIterator<T> for MsQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut queue = Self::new();
        queue.extend(iter);
        queue
    }
}

impl<T> fmt::Debug for MsQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MsQueue")
            .field("is_empty", &self.is_empty())
            .field("reclaim", &self.reclaim_stats())
            .finish()
    }
}

impl<T> Drop for MsQueue<T> {
    fn drop(&mut self) {
        let mut cur = self.head.load(Ordering::Relaxed);
        while !cur.is_null() {
            // SAFETY: exclusive access; every node on the chain is owned by
            // the queue and was never retired.
            let node = unsafe { Box::from_raw(cur) };
            cur = node.next.load(Ordering::Relaxed);
        }
        // Retired nodes are freed when `domain` drops.
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_validate_reports_tail_not_last() {
        let mut queue = MsQueue::new();
        queue.enqueue(1);
        let head = queue.head.load(Ordering::Relaxed);
        let tail = queue.tail.load(Ordering::Relaxed);
        assert_ne!(head, tail);

        queue.tail.store(head, Ordering::Relaxed);
        assert_eq!(queue.validate(), Err(InvariantViolation::TailNotLast));

        queue.tail.store(tail, Ordering::Relaxed);
        assert_eq!(queue.validate(), Ok(()));
        assert_eq!(queue.dequeue(), Some(1));
    }

    #[test]
    fn test_validate_reports_dummy_holding_element() {
        let mut queue = MsQueue::new();
        queue.enqueue(1);
        let head = queue.head.load(Ordering::Relaxed);

        // SAFETY: `&mut queue` rules out concurrent access to the dummy.
        unsafe { *(*head).element.get() = Some(7) };
        assert_eq!(queue.validate(), Err(InvariantViolation::DummyHoldsElement));

        // SAFETY: as above.
        unsafe { *(*head).element.get() = None };
        assert_eq!(queue.validate(), Ok(()));
        assert_eq!(queue.dequeue(), Some(1));
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_dequeue_scan_frees_its_own_node() {
        // One record: the scan runs on every fourth retirement.
        let queue = MsQueue::with_config(ReclaimConfig::default().with_scan_threshold(1));
        for i in 0..4 {
            queue.enqueue(i);
            assert_eq!(queue.dequeue(), Some(i));
        }
        let stats = queue.reclaim_stats();
        assert_eq!(stats.retired, 4);
        assert_eq!(stats.reclaimed, 4, "{stats:?}");
    }
}
