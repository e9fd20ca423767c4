use core::cell::UnsafeCell;

use crate::atomic::AtomicSlot;

/// A link in the queue's singly-linked chain.
///
/// `element` is `None` for the dummy node at the front of the chain. It is
/// written once at construction and taken once by the dequeuer that makes
/// this node the new dummy; nobody else touches it.
pub(crate) struct Node<T> {
    pub(crate) element: UnsafeCell<Option<T>>,
    /// Goes from null to a successor exactly once.
    pub(crate) next: AtomicSlot<Node<T>>,
}

impl<T> Node<T> {
    /// Allocates an element-less node.
    pub(crate) fn dummy() -> *mut Self {
        Self::alloc(None)
    }

    /// Allocates a node carrying `element`.
    pub(crate) fn with_element(element: T) -> *mut Self {
        Self::alloc(Some(element))
    }

    fn alloc(element: Option<T>) -> *mut Self {
        Box::into_raw(Box::new(Self {
            element: UnsafeCell::new(element),
            next: AtomicSlot::null(),
        }))
    }
}
