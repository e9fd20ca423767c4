use core::cell::UnsafeCell;
use core::ptr;

use crate::sync::{AtomicBool, AtomicPtr, Ordering};

/// Hazard slots carried by each record.
///
/// Two is enough for the Michael-Scott queue: `dequeue` protects the current
/// head and its successor, `enqueue` protects only the tail.
pub const HAZARDS_PER_RECORD: usize = 2;

/// A node that has been unlinked and is waiting to be freed.
///
/// The concrete type is erased so one retired list can hold any node type.
pub(crate) struct Retired {
    ptr: *mut u8,
    reclaim: unsafe fn(*mut u8),
}

impl Retired {
    /// # Safety
    /// `ptr` must come from `Box::into_raw` and must not be freed elsewhere.
    pub(crate) unsafe fn new<N>(ptr: *mut N) -> Self {
        Self {
            ptr: ptr.cast(),
            reclaim: drop_boxed::<N>,
        }
    }

    #[inline]
    pub(crate) fn addr(&self) -> *mut u8 {
        self.ptr
    }

    /// # Safety
    /// No thread may still hold a reference to the node.
    pub(crate) unsafe fn reclaim(self) {
        (self.reclaim)(self.ptr);
    }
}

unsafe fn drop_boxed<N>(ptr: *mut u8) {
    drop(Box::from_raw(ptr.cast::<N>()));
}

/// Per-thread hazard state.
///
/// A record is owned by whichever thread last flipped `active` from `false`
/// to `true`. Only the owner writes `hazards` and touches `retired`; any
/// thread may read `hazards` during a scan.
pub(crate) struct HazardRecord {
    pub(crate) hazards: [AtomicPtr<u8>; HAZARDS_PER_RECORD],
    active: AtomicBool,
    /// Written once before the record is published, immutable afterwards.
    pub(crate) next: *mut HazardRecord,
    pub(crate) retired: UnsafeCell<Vec<Retired>>,
}

// SAFETY: `retired` is only accessed by the record's current owner, and
// ownership is handed over through the `active` flag (Release/Acquire).
unsafe impl Send for HazardRecord {}
unsafe impl Sync for HazardRecord {}

impl HazardRecord {
    /// A fresh record, already claimed by the caller.
    pub(crate) fn new_claimed() -> Self {
        Self {
            hazards: [
                AtomicPtr::new(ptr::null_mut()),
                AtomicPtr::new(ptr::null_mut()),
            ],
            active: AtomicBool::new(true),
            next: ptr::null_mut(),
            retired: UnsafeCell::new(Vec::new()),
        }
    }

    /// Attempts to take ownership of an idle record.
    #[inline]
    pub(crate) fn try_claim(&self) -> bool {
        !self.active.load(Ordering::Relaxed)
            && self
                .active
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
    }

    /// Clears every hazard and gives the record back to the domain.
    #[inline]
    pub(crate) fn release(&self) {
        for hazard in &self.hazards {
            hazard.store(ptr::null_mut(), Ordering::Release);
        }
        self.active.store(false, Ordering::Release);
    }
}
