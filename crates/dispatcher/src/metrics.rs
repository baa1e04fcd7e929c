//! Per-destination counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by a destination's limiters and sender workers
#[derive(Debug, Default)]
pub struct DestinationMetrics {
    /// Signals accepted into an admission buffer
    admitted: AtomicU64,
    /// Signals discarded because an admission buffer was full
    dropped: AtomicU64,
    /// Signals forwarded by a pacing loop to the outbound channel
    released: AtomicU64,
    /// Requests that reached the destination
    sent: AtomicU64,
    /// Requests that failed in transport
    failed: AtomicU64,
}

impl DestinationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admitted(&self) -> u64 {
        self.admitted.load(Ordering::Relaxed)
    }

    pub fn inc_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn inc_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }

    pub fn inc_released(&self) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn inc_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            admitted: self.admitted(),
            dropped: self.dropped(),
            released: self.released(),
            sent: self.sent(),
            failed: self.failed(),
        }
    }
}

/// Point-in-time copy of [`DestinationMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub admitted: u64,
    pub dropped: u64,
    pub released: u64,
    pub sent: u64,
    pub failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let metrics = DestinationMetrics::new();
        metrics.inc_admitted();
        metrics.inc_admitted();
        metrics.inc_dropped();
        metrics.inc_released();
        metrics.inc_sent();
        metrics.inc_failed();

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                admitted: 2,
                dropped: 1,
                released: 1,
                sent: 1,
                failed: 1,
            }
        );
    }
}
