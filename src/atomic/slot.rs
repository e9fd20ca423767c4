use core::fmt;
use core::ptr;

use crate::sync::{AtomicPtr, Ordering};

/// An atomically readable, compare-and-swappable reference to an `N`.
///
/// A null value means "no node". The slot never owns its target; ownership of
/// nodes is tracked by the queue and the reclamation domain.
#[repr(transparent)]
pub struct AtomicSlot<N> {
    inner: AtomicPtr<N>,
}

impl<N> AtomicSlot<N> {
    /// Creates a slot holding `ptr`.
    #[inline]
    pub fn new(ptr: *mut N) -> Self {
        Self {
            inner: AtomicPtr::new(ptr),
        }
    }

    /// Creates an empty (null) slot.
    #[inline]
    pub fn null() -> Self {
        Self::new(ptr::null_mut())
    }

    /// Loads the current pointer.
    #[inline(always)]
    pub fn load(&self, order: Ordering) -> *mut N {
        self.inner.load(order)
    }

    /// Loads with `Acquire` ordering.
    #[inline(always)]
    pub fn load_acquire(&self) -> *mut N {
        self.inner.load(Ordering::Acquire)
    }

    /// Stores a new pointer.
    ///
    /// Only used while no other thread can observe the slot.
    #[inline(always)]
    pub fn store(&self, ptr: *mut N, order: Ordering) {
        self.inner.store(ptr, order);
    }

    /// Returns `true` if the slot currently holds null.
    #[inline]
    pub fn is_null(&self, order: Ordering) -> bool {
        self.inner.load(order).is_null()
    }

    /// Stores `new` if the slot currently holds `current`.
    #[inline(always)]
    pub fn compare_exchange(
        &self,
        current: *mut N,
        new: *mut N,
        success: Ordering,
        failure: Ordering,
    ) -> Result<*mut N, *mut N> {
        self.inner.compare_exchange(current, new, success, failure)
    }

    /// Compare-and-swap with `AcqRel` on success and `Acquire` on failure.
    ///
    /// Returns `true` if the swap happened.
    #[inline(always)]
    pub fn cas(&self, current: *mut N, new: *mut N) -> bool {
        self.compare_exchange(current, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl<N> Default for AtomicSlot<N> {
    fn default() -> Self {
        Self::null()
    }
}

impl<N> fmt::Debug for AtomicSlot<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicSlot")
            .field(&self.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_slot_cas_only_from_expected() {
        let mut a = 1u32;
        let mut b = 2u32;
        let pa: *mut u32 = &mut a;
        let pb: *mut u32 = &mut b;

        let slot = AtomicSlot::null();
        assert!(slot.is_null(Ordering::Relaxed));

        assert!(!slot.cas(pa, pb));
        assert!(slot.cas(ptr::null_mut(), pa));
        assert_eq!(slot.load_acquire(), pa);

        assert_eq!(
            slot.compare_exchange(pb, pa, Ordering::AcqRel, Ordering::Acquire),
            Err(pa)
        );
        assert!(slot.cas(pa, pb));
        assert_eq!(slot.load(Ordering::Relaxed), pb);
    }
}
