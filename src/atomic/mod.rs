//! Atomic node-reference cells.
//!
//! The queue never touches a raw `AtomicPtr` directly: `head`, `tail` and every
//! node's `next` are [`AtomicSlot`]s, a nullable reference cell that exposes
//! exactly the operations the algorithm needs (load, compare-and-swap, and a
//! plain store for single-threaded setup and teardown).

/// Nullable atomic node pointer.
pub mod slot;

pub use slot::AtomicSlot;
