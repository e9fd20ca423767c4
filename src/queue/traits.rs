use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::invariant::InvariantViolation;
use super::ms_queue::MsQueue;

/// A FIFO queue shared between threads by reference.
///
/// Lets tests and benchmarks drive different queue implementations through
/// one harness.
pub trait ConcurrentQueue<T>: Send + Sync {
    /// Appends an element at the back.
    fn enqueue(&self, element: T);

    /// Removes the front element, or returns `None` if the queue is empty.
    fn dequeue(&self) -> Option<T>;

    /// Checks structural invariants while no operation is in flight.
    ///
    /// # Errors
    /// Returns the violated invariant, if any.
    fn validate(&mut self) -> Result<(), InvariantViolation> {
        Ok(())
    }
}

impl<T: Send> ConcurrentQueue<T> for MsQueue<T> {
    #[inline]
    fn enqueue(&self, element: T) {
        MsQueue::enqueue(self, element);
    }

    #[inline]
    fn dequeue(&self) -> Option<T> {
        MsQueue::dequeue(self)
    }

    fn validate(&mut self) -> Result<(), InvariantViolation> {
        MsQueue::validate(self)
    }
}

/// A `Mutex<VecDeque<T>>` behind the [`ConcurrentQueue`] interface.
///
/// Serves as the lock-based baseline when measuring [`MsQueue`].
#[derive(Debug)]
pub struct MutexQueue<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T> MutexQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        // A panic while holding the lock cannot leave the deque half-updated.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for MutexQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> ConcurrentQueue<T> for MutexQueue<T> {
    fn enqueue(&self, element: T) {
        self.lock().push_back(element);
    }

    fn dequeue(&self) -> Option<T> {
        self.lock().pop_front()
    }
}
