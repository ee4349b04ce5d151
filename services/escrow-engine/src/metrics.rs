//! Engine counters
//!
//! In-process atomics exported as a sorted map; no exporter wiring.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifecycle counters for the escrow engine
#[derive(Debug, Default)]
pub struct EngineMetrics {
    // Money in
    pub captures: AtomicU64,
    pub capture_failures: AtomicU64,

    // Money out
    pub payouts: AtomicU64,
    pub payout_failures: AtomicU64,
    pub refunds: AtomicU64,

    // Teardown and contention
    pub cancellations: AtomicU64,
    pub conflicts: AtomicU64,
    pub gateway_timeouts: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_capture(&self) {
        self.captures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_capture_failure(&self) {
        self.capture_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_payout(&self) {
        self.payouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_payout_failure(&self) {
        self.payout_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refund(&self) {
        self.refunds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancellation(&self) {
        self.cancellations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_gateway_timeout(&self) {
        self.gateway_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Export counters as a BTreeMap for exposition
    pub fn export(&self) -> BTreeMap<String, u64> {
        let mut m = BTreeMap::new();
        m.insert("captures".to_string(), self.captures.load(Ordering::Relaxed));
        m.insert(
            "capture_failures".to_string(),
            self.capture_failures.load(Ordering::Relaxed),
        );
        m.insert("payouts".to_string(), self.payouts.load(Ordering::Relaxed));
        m.insert(
            "payout_failures".to_string(),
            self.payout_failures.load(Ordering::Relaxed),
        );
        m.insert("refunds".to_string(), self.refunds.load(Ordering::Relaxed));
        m.insert(
            "cancellations".to_string(),
            self.cancellations.load(Ordering::Relaxed),
        );
        m.insert(
            "conflicts".to_string(),
            self.conflicts.load(Ordering::Relaxed),
        );
        m.insert(
            "gateway_timeouts".to_string(),
            self.gateway_timeouts.load(Ordering::Relaxed),
        );
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_export() {
        let metrics = EngineMetrics::new();
        metrics.record_capture();
        metrics.record_capture();
        metrics.record_payout();
        metrics.record_conflict();

        let exported = metrics.export();
        assert_eq!(exported["captures"], 2);
        assert_eq!(exported["payouts"], 1);
        assert_eq!(exported["conflicts"], 1);
        assert_eq!(exported["refunds"], 0);
    }
}
