use core::cell::Cell;
use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ptr;

use super::record::{HazardRecord, Retired, HAZARDS_PER_RECORD};
use super::{ReclaimConfig, ReclaimStats};
use crate::atomic::AtomicSlot;
use crate::sync::{debug_event, fence, trace_event, AtomicPtr, AtomicUsize, Backoff, Ordering};

/// A hazard-pointer domain: the set of records and retired nodes belonging to
/// one data structure.
///
/// Records are appended to a lock-free list and reused by later threads once
/// released; they are only freed when the domain itself is dropped, together
/// with every node still waiting on a retired list.
pub struct Domain {
    records: AtomicPtr<HazardRecord>,
    record_count: AtomicUsize,
    retired_total: AtomicUsize,
    reclaimed_total: AtomicUsize,
    config: ReclaimConfig,
}

// SAFETY: all shared state is atomic; records are handed between threads
// through their `active` flag.
unsafe impl Send for Domain {}
unsafe impl Sync for Domain {}

impl Domain {
    /// Creates an empty domain with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ReclaimConfig::default())
    }

    /// Creates an empty domain.
    pub fn with_config(config: ReclaimConfig) -> Self {
        Self {
            records: AtomicPtr::new(ptr::null_mut()),
            record_count: AtomicUsize::new(0),
            retired_total: AtomicUsize::new(0),
            reclaimed_total: AtomicUsize::new(0),
            config,
        }
    }

    /// Returns the configuration this domain was built with.
    pub fn config(&self) -> ReclaimConfig {
        self.config
    }

    /// Claims a hazard record for the calling thread.
    ///
    /// Reuses an idle record when one exists, otherwise allocates and
    /// publishes a new one. Never blocks.
    pub fn acquire(&self) -> HazardGuard<'_> {
        let mut cur = self.records.load(Ordering::Acquire);
        while !cur.is_null() {
            // SAFETY: records are only freed in `Drop`, which needs `&mut self`.
            let record = unsafe { &*cur };
            if record.try_claim() {
                return HazardGuard::new(self, record);
            }
            cur = record.next;
        }

        let fresh = Box::into_raw(Box::new(HazardRecord::new_claimed()));
        let backoff = Backoff::new();
        let mut head = self.records.load(Ordering::Relaxed);
        loop {
            // SAFETY: `fresh` is not yet visible to any other thread.
            unsafe { (*fresh).next = head };
            match self
                .records
                .compare_exchange_weak(head, fresh, Ordering::Release, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(current) => {
                    head = current;
                    backoff.spin();
                }
            }
        }
        self.record_count.fetch_add(1, Ordering::Relaxed);
        debug_event!(
            records = self.record_count.load(Ordering::Relaxed),
            "hazard record allocated"
        );

        // SAFETY: just published; lives until the domain drops.
        HazardGuard::new(self, unsafe { &*fresh })
    }

    /// Scans every idle record's retired list and frees what is unprotected.
    ///
    /// Records currently held by a guard are skipped; their owners scan them.
    pub fn flush(&self) {
        let mut cur = self.records.load(Ordering::Acquire);
        while !cur.is_null() {
            // SAFETY: see `acquire`.
            let record = unsafe { &*cur };
            if record.try_claim() {
                let guard = HazardGuard::new(self, record);
                guard.scan();
            }
            cur = record.next;
        }
    }

    /// Snapshot of the domain's counters.
    pub fn stats(&self) -> ReclaimStats {
        ReclaimStats {
            records: self.record_count.load(Ordering::Relaxed),
            retired: self.retired_total.load(Ordering::Relaxed),
            reclaimed: self.reclaimed_total.load(Ordering::Relaxed),
        }
    }

    fn scan_threshold(&self) -> usize {
        let slots = self.record_count.load(Ordering::Relaxed) * HAZARDS_PER_RECORD;
        self.config.scan_threshold.max(2 * slots)
    }

    /// Frees every entry of `retired` that no hazard slot points at.
    fn scan(&self, retired: &mut Vec<Retired>) {
        if retired.is_empty() {
            return;
        }

        // Pairs with the fence in `HazardGuard::publish`: a hazard published
        // before the unlink is visible here, and one published after it fails
        // validation in its owner.
        fence(Ordering::SeqCst);

        let mut hazards = Vec::with_capacity(
            self.record_count.load(Ordering::Relaxed) * HAZARDS_PER_RECORD,
        );
        let mut cur = self.records.load(Ordering::Acquire);
        while !cur.is_null() {
            // SAFETY: see `acquire`.
            let record = unsafe { &*cur };
            for hazard in &record.hazards {
                let ptr = hazard.load(Ordering::Acquire);
                if !ptr.is_null() {
                    hazards.push(ptr);
                }
            }
            cur = record.next;
        }
        hazards.sort_unstable();
        hazards.dedup();

        let mut freed = 0usize;
        for entry in mem::take(retired) {
            if hazards.binary_search(&entry.addr()).is_ok() {
                retired.push(entry);
            } else {
                // SAFETY: unlinked before retirement and not protected by any
                // hazard, so no thread can reach it any more.
                unsafe { entry.reclaim() };
                freed += 1;
            }
        }
        self.reclaimed_total.fetch_add(freed, Ordering::Relaxed);
        trace_event!(freed, kept = retired.len(), "hazard scan");
    }
}

impl Default for Domain {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Domain")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Drop for Domain {
    fn drop(&mut self) {
        let mut freed = 0usize;
        let mut cur = self.records.load(Ordering::Acquire);
        while !cur.is_null() {
            // SAFETY: `&mut self` means no guard is alive, so every record is
            // idle and nothing on a retired list can still be referenced.
            let record = unsafe { Box::from_raw(cur) };
            cur = record.next;
            for entry in record.retired.into_inner() {
                unsafe { entry.reclaim() };
                freed += 1;
            }
        }
        self.reclaimed_total.fetch_add(freed, Ordering::Relaxed);
        debug_event!(
            records = self.record_count.load(Ordering::Relaxed),
            reclaimed = self.reclaimed_total.load(Ordering::Relaxed),
            "hazard domain dropped"
        );
    }
}

/// Exclusive use of one hazard record.
///
/// Dropping the guard clears its hazards and returns the record to the
/// domain. Retired nodes stay on the record for the next owner to scan.
pub struct HazardGuard<'d> {
    domain: &'d Domain,
    record: &'d HazardRecord,
    // The retired list is mutated through `&self`.
    _not_sync: PhantomData<Cell<()>>,
}

impl<'d> HazardGuard<'d> {
    fn new(domain: &'d Domain, record: &'d HazardRecord) -> Self {
        Self {
            domain,
            record,
            _not_sync: PhantomData,
        }
    }

    /// Reads `slot` and protects the result in hazard `index`.
    ///
    /// Loops until the published value is confirmed to still be in `slot`, so
    /// the returned node cannot be freed while the hazard stays set.
    ///
    /// # Panics
    /// Panics if `index >= HAZARDS_PER_RECORD`.
    #[inline]
    pub fn protect<N>(&self, index: usize, slot: &AtomicSlot<N>) -> *mut N {
        let mut ptr = slot.load(Ordering::Relaxed);
        loop {
            self.publish(index, ptr);
            let current = slot.load_acquire();
            if current == ptr {
                return ptr;
            }
            ptr = current;
        }
    }

    /// Publishes `ptr` in hazard `index` without validating it.
    ///
    /// The caller must re-check afterwards that the node is still reachable
    /// before dereferencing it.
    ///
    /// # Panics
    /// Panics if `index >= HAZARDS_PER_RECORD`.
    #[inline]
    pub fn publish<N>(&self, index: usize, ptr: *mut N) {
        self.record.hazards[index].store(ptr.cast(), Ordering::Release);
        fence(Ordering::SeqCst);
    }

    /// Clears hazard `index`.
    ///
    /// # Panics
    /// Panics if `index >= HAZARDS_PER_RECORD`.
    #[inline]
    pub fn clear(&self, index: usize) {
        self.record.hazards[index].store(ptr::null_mut(), Ordering::Release);
    }

    /// Hands an unlinked node to the domain for deferred destruction.
    ///
    /// # Safety
    /// - `ptr` must come from `Box::into_raw` and be owned by this domain's structure.
    /// - It must already be unreachable from the structure's shared slots, so
    ///   no thread can newly protect it.
    /// - It must not be retired twice.
    /// - `N` must be safe to drop on another thread.
    pub unsafe fn retire<N>(&self, ptr: *mut N) {
        // SAFETY: only the record's owner touches the retired list.
        let retired = &mut *self.record.retired.get();
        retired.push(Retired::new(ptr));
        self.domain.retired_total.fetch_add(1, Ordering::Relaxed);
        if retired.len() >= self.domain.scan_threshold() {
            self.domain.scan(retired);
        }
    }

    /// Forces a scan of this record's retired list.
    pub fn scan(&self) {
        // SAFETY: only the record's owner touches the retired list.
        let retired = unsafe { &mut *self.record.retired.get() };
        self.domain.scan(retired);
    }

    /// Number of nodes waiting on this record's retired list.
    pub fn pending(&self) -> usize {
        // SAFETY: only the record's owner touches the retired list.
        unsafe { (*self.record.retired.get()).len() }
    }
}

impl Drop for HazardGuard<'_> {
    fn drop(&mut self) {
        self.record.release();
    }
}

impl fmt::Debug for HazardGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HazardGuard")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Tracked(Arc<AtomicUsize>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn tracked(drops: &Arc<AtomicUsize>) -> *mut Tracked {
        Box::into_raw(Box::new(Tracked(drops.clone())))
    }

    #[test]
    fn test_records_are_reused() {
        let domain = Domain::new();
        drop(domain.acquire());
        drop(domain.acquire());
        assert_eq!(domain.stats().records, 1);

        let a = domain.acquire();
        let b = domain.acquire();
        assert_eq!(domain.stats().records, 2);
        drop((a, b));
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn test_clear_rejects_out_of_range_index() {
        let domain = Domain::new();
        let guard = domain.acquire();
        guard.clear(std::hint::black_box(HAZARDS_PER_RECORD));
    }

    #[test]
    fn test_protected_node_survives_scan() {
        let drops = Arc::new(AtomicUsize::new(0));
        let domain = Domain::with_config(ReclaimConfig::default().with_scan_threshold(1));
        let ptr = tracked(&drops);
        let slot = AtomicSlot::new(ptr);

        let reader = domain.acquire();
        assert_eq!(reader.protect(0, &slot), ptr);

        // Unlink, then retire from another record.
        slot.store(ptr::null_mut(), Ordering::Release);
        let writer = domain.acquire();
        unsafe { writer.retire(ptr) };
        writer.scan();
        assert_eq!(drops.load(Ordering::Relaxed), 0);
        assert_eq!(writer.pending(), 1);

        drop(reader);
        writer.scan();
        assert_eq!(drops.load(Ordering::Relaxed), 1);
        assert_eq!(writer.pending(), 0);
        assert_eq!(domain.stats().reclaimed, 1);
    }

    #[test]
    fn test_flush_frees_idle_records() {
        let drops = Arc::new(AtomicUsize::new(0));
        let domain = Domain::new();
        {
            let guard = domain.acquire();
            for _ in 0..5 {
                unsafe { guard.retire(tracked(&drops)) };
            }
        }
        assert_eq!(domain.stats().pending(), 5);
        domain.flush();
        assert_eq!(drops.load(Ordering::Relaxed), 5);
        assert_eq!(domain.stats().pending(), 0);
    }

    #[test]
    fn test_threshold_triggers_scan() {
        let drops = Arc::new(AtomicUsize::new(0));
        let domain = Domain::with_config(ReclaimConfig::default().with_scan_threshold(8));
        let guard = domain.acquire();
        // One record, two slots: effective threshold is max(8, 4) = 8.
        for _ in 0..7 {
            unsafe { guard.retire(tracked(&drops)) };
        }
        assert_eq!(drops.load(Ordering::Relaxed), 0);
        unsafe { guard.retire(tracked(&drops)) };
        assert_eq!(drops.load(Ordering::Relaxed), 8);
    }

    #[test]
    fn test_drop_frees_pending() {
        let drops = Arc::new(AtomicUsize::new(0));
        {
            let domain = Domain::new();
            let guard = domain.acquire();
            for _ in 0..3 {
                unsafe { guard.retire(tracked(&drops)) };
            }
        }
        assert_eq!(drops.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let domain = Domain::new();
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        let guard = domain.acquire();
                        guard.publish(0, &domain as *const Domain as *mut Domain);
                    }
                });
            }
        });
        assert!(domain.stats().records <= 8);
        assert!(domain.stats().records >= 1);
    }
}
