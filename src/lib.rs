//! # `msqueue` - Lock-Free Michael-Scott Queue
//!
//! An unbounded, multi-producer multi-consumer FIFO queue whose `enqueue` and
//! `dequeue` never take a lock, together with the hazard-pointer reclamation
//! scheme that makes freeing its nodes safe without a garbage collector.
//!
//! ## Safety Guarantees
//!
//! ### Memory Safety
//! - **No use-after-free**: a node is only freed once no thread has it
//!   published as a hazard.
//! - **No ABA**: every compare-and-swap on a node identity happens while the
//!   node is protected, so its address cannot be recycled underneath it.
//! - **Unambiguous emptiness**: `dequeue` returns `Option<T>`. `None` cannot be
//!   enqueued as an element, so "empty" never collides with a real value.
//!
//! ### Concurrency Safety
//! - **Lock-free**: some thread always completes on every contended step;
//!   individual calls retry but never block.
//! - **Linearizable**: every operation takes effect at a single CAS (or, for
//!   an empty `dequeue`, a single read).
//! - **Helping**: threads that find `tail` lagging advance it themselves.
//!
//! ## Architecture
//!
//! 1. **Atomic slots** ([`atomic::AtomicSlot`]): nullable node references with
//!    load and compare-and-swap.
//! 2. **Reclamation** ([`reclaim::Domain`]): per-queue hazard records, retired
//!    lists and lock-free scans.
//! 3. **Queue** ([`MsQueue`]): the Michael-Scott algorithm on top of both.
//!
//! ## Example
//!
//! ```rust
//! use msqueue::MsQueue;
//!
//! let mut queue = MsQueue::new();
//! queue.enqueue("a");
//! queue.enqueue("b");
//! assert_eq!(queue.dequeue(), Some("a"));
//! assert_eq!(queue.dequeue(), Some("b"));
//! assert_eq!(queue.dequeue(), None);
//! assert!(queue.validate().is_ok());
//! ```
//!
//! ## Features
//!
//! - `tracing`: emits `tracing` events for record allocation, reclamation
//!   scans, teardown and failed validation.

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

mod sync;

pub mod atomic;
pub mod queue;
pub mod reclaim;

pub use atomic::AtomicSlot;
pub use queue::{ConcurrentQueue, InvariantViolation, MsQueue, MutexQueue};
pub use reclaim::{Domain, HazardGuard, ReclaimConfig, ReclaimStats};

// Compile-time layout checks.
#[cfg(not(loom))]
const _: () = {
    use core::mem;

    // `AtomicSlot` is `repr(transparent)` over `AtomicPtr`.
    assert!(mem::size_of::<AtomicSlot<u64>>() == mem::size_of::<*mut u64>());
    assert!(mem::align_of::<AtomicSlot<u64>>() == mem::align_of::<*mut u64>());

    // `head` and `tail` sit on separate cache lines.
    assert!(
        mem::size_of::<crossbeam_utils::CachePadded<AtomicSlot<u64>>>()
            >= mem::size_of::<AtomicSlot<u64>>() * 2
    );
};
