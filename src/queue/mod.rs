//! Queue implementations.
//!
//! - [`MsQueue`]: the unbounded lock-free Michael-Scott queue.
//! - [`MutexQueue`]: a lock-based reference with the same interface.
//!
//! Both implement [`ConcurrentQueue`].
//!
//! ## Ordering guarantees
//!
//! `MsQueue` is linearizable. An `enqueue` takes effect when its node is
//! linked after the last node; a `dequeue` takes effect when `head` moves past
//! the dummy, or, when it returns `None`, at the read that found the dummy
//! without a successor. Elements come out in link order, not call-start order.
//!
//! ## Progress
//!
//! Lock-free: on every contended step some thread's CAS succeeds. A single
//! call may retry indefinitely under adversarial scheduling but never blocks.

mod invariant;
mod ms_queue;
mod node;
mod traits;

pub use invariant::InvariantViolation;
pub use ms_queue::MsQueue;
pub use traits::{ConcurrentQueue, MutexQueue};
