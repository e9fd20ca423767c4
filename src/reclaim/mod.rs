//! Hazard-pointer memory reclamation.
//!
//! A node unlinked from a lock-free structure may still be dereferenced by a
//! thread that loaded its address just before the unlink. Freeing it
//! immediately would be a use-after-free, and reusing its address would let a
//! stale compare-and-swap succeed (ABA). This module defers the free until no
//! thread has the node published as a *hazard*.
//!
//! ## Protocol
//!
//! 1. A thread claims a [`HazardGuard`] from the structure's [`Domain`].
//! 2. Before dereferencing a shared node it publishes the address in one of
//!    the guard's hazard slots and re-validates that the node is still
//!    reachable ([`HazardGuard::protect`]).
//! 3. After unlinking a node it calls [`HazardGuard::retire`]. The node sits
//!    on the guard's private retired list until a scan finds no hazard
//!    pointing at it, at which point it is dropped.
//!
//! Every step is lock-free: records are claimed and appended with CAS, and a
//! scan only reads other threads' hazard slots.
//!
//! Domains are per-instance. Two queues never share records or retired lists.

mod domain;
mod record;

pub use domain::{Domain, HazardGuard};
pub use record::HAZARDS_PER_RECORD;

use serde::Serialize;

/// Default number of retired nodes a record accumulates before it scans.
pub const DEFAULT_SCAN_THRESHOLD: usize = 64;

/// Runtime tuning for a [`Domain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReclaimConfig {
    /// Minimum retired-list length that triggers a scan.
    ///
    /// The effective threshold also grows with the number of hazard slots so
    /// each scan frees a constant fraction of the list on average.
    pub scan_threshold: usize,
}

impl ReclaimConfig {
    /// Returns a config with the given scan threshold (at least 1).
    pub const fn with_scan_threshold(mut self, threshold: usize) -> Self {
        self.scan_threshold = if threshold == 0 { 1 } else { threshold };
        self
    }
}

impl Default for ReclaimConfig {
    fn default() -> Self {
        Self {
            scan_threshold: DEFAULT_SCAN_THRESHOLD,
        }
    }
}

/// A point-in-time snapshot of a domain's bookkeeping counters.
///
/// Counters are updated with relaxed atomics, so a snapshot taken while
/// other threads are active may be slightly stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReclaimStats {
    /// Hazard records allocated so far (one per concurrently active thread, at peak).
    pub records: usize,
    /// Nodes handed to [`HazardGuard::retire`].
    pub retired: usize,
    /// Retired nodes that have been freed.
    pub reclaimed: usize,
}

impl ReclaimStats {
    /// Retired nodes still waiting to be freed.
    pub fn pending(&self) -> usize {
        self.retired.saturating_sub(self.reclaimed)
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_config_threshold_is_clamped() {
        assert_eq!(ReclaimConfig::default().scan_threshold, DEFAULT_SCAN_THRESHOLD);
        assert_eq!(ReclaimConfig::default().with_scan_threshold(0).scan_threshold, 1);
        assert_eq!(ReclaimConfig::default().with_scan_threshold(8).scan_threshold, 8);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = ReclaimStats {
            records: 2,
            retired: 10,
            reclaimed: 7,
        };
        assert_eq!(stats.pending(), 3);
        let json = serde_json::to_string(&stats).unwrap();
        assert_eq!(json, r#"{"records":2,"retired":10,"reclaimed":7}"#);
    }
}
