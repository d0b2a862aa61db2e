//! Map Metrics Module
//!
//! Operation counters for [`ConcurrentMap`](crate::ConcurrentMap). Counters live
//! outside the data lock and use relaxed atomics, so recording never extends a
//! critical section. With the `metrics` feature disabled every call compiles to
//! nothing and snapshots are all zeros.

#[cfg(feature = "metrics")]
use core::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of a map's operation counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MapMetrics {
    /// Single-key reads (`get`, `get_with`, `contains_key`)
    pub reads: u64,
    /// Reads that found their key
    pub read_hits: u64,
    /// Reads that did not find their key
    pub read_misses: u64,
    /// Inserts and overwrites
    pub writes: u64,
    /// Delete calls, whether or not the key was present
    pub removals: u64,
    /// Clear calls
    pub clears: u64,
    /// Whole-map copies and encodes
    pub snapshots: u64,
    /// Wholesale swaps of the inner container (decode, `replace`)
    pub replacements: u64,
    /// Failed encodes
    pub encode_failures: u64,
    /// Failed decodes
    pub decode_failures: u64,
    /// Timeout-bounded acquisitions that gave up
    pub timeouts: u64,
    /// Acquisitions that found the lock held and had to wait
    pub contended_acquisitions: u64,
    /// Total lock acquisitions
    pub acquisitions: u64,
}

impl MapMetrics {
    /// Read hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        if self.reads == 0 {
            0.0
        } else {
            (self.read_hits as f64 / self.reads as f64) * 100.0
        }
    }

    /// Share of lock acquisitions that had to wait, as a percentage
    pub fn contention_rate(&self) -> f64 {
        if self.acquisitions == 0 {
            0.0
        } else {
            (self.contended_acquisitions as f64 / self.acquisitions as f64) * 100.0
        }
    }
}

/// Internal atomic counters
#[cfg(feature = "metrics")]
#[derive(Debug, Default)]
pub(crate) struct AtomicMetrics {
    reads: AtomicU64,
    read_hits: AtomicU64,
    writes: AtomicU64,
    removals: AtomicU64,
    clears: AtomicU64,
    snapshots: AtomicU64,
    replacements: AtomicU64,
    encode_failures: AtomicU64,
    decode_failures: AtomicU64,
    timeouts: AtomicU64,
    contended: AtomicU64,
    acquisitions: AtomicU64,
}

#[cfg(feature = "metrics")]
impl AtomicMetrics {
    #[inline]
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_read(&self, hit: bool) {
        Self::bump(&self.reads);
        if hit {
            Self::bump(&self.read_hits);
        }
    }

    pub(crate) fn record_write(&self) {
        Self::bump(&self.writes);
    }

    pub(crate) fn record_removal(&self) {
        Self::bump(&self.removals);
    }

    pub(crate) fn record_clear(&self) {
        Self::bump(&self.clears);
    }

    pub(crate) fn record_snapshot(&self) {
        Self::bump(&self.snapshots);
    }

    pub(crate) fn record_replacement(&self) {
        Self::bump(&self.replacements);
    }

    pub(crate) fn record_encode_failure(&self) {
        Self::bump(&self.encode_failures);
    }

    pub(crate) fn record_decode_failure(&self) {
        Self::bump(&self.decode_failures);
    }

    pub(crate) fn record_timeout(&self) {
        Self::bump(&self.timeouts);
    }

    /// Record one lock acquisition and whether it had to wait
    pub(crate) fn record_acquisition(&self, contended: bool) {
        Self::bump(&self.acquisitions);
        if contended {
            Self::bump(&self.contended);
        }
    }

    pub(crate) fn snapshot(&self) -> MapMetrics {
        let reads = self.reads.load(Ordering::Relaxed);
        let read_hits = self.read_hits.load(Ordering::Relaxed);

        MapMetrics {
            reads,
            read_hits,
            read_misses: reads.saturating_sub(read_hits),
            writes: self.writes.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
            snapshots: self.snapshots.load(Ordering::Relaxed),
            replacements: self.replacements.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            contended_acquisitions: self.contended.load(Ordering::Relaxed),
            acquisitions: self.acquisitions.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&self) {
        for counter in [
            &self.reads,
            &self.read_hits,
            &self.writes,
            &self.removals,
            &self.clears,
            &self.snapshots,
            &self.replacements,
            &self.encode_failures,
            &self.decode_failures,
            &self.timeouts,
            &self.contended,
            &self.acquisitions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub(crate) struct AtomicMetrics;

#[cfg(not(feature = "metrics"))]
impl AtomicMetrics {
    pub(crate) fn record_read(&self, _hit: bool) {}
    pub(crate) fn record_write(&self) {}
    pub(crate) fn record_removal(&self) {}
    pub(crate) fn record_clear(&self) {}
    pub(crate) fn record_snapshot(&self) {}
    pub(crate) fn record_replacement(&self) {}
    pub(crate) fn record_encode_failure(&self) {}
    pub(crate) fn record_decode_failure(&self) {}
    pub(crate) fn record_timeout(&self) {}
    pub(crate) fn record_acquisition(&self, _contended: bool) {}
    pub(crate) fn snapshot(&self) -> MapMetrics {
        MapMetrics::default()
    }
    pub(crate) fn reset(&self) {}
}

/// Trait for data structures that support operation metrics
pub trait MetricsCollector {
    /// Get current metrics
    fn metrics(&self) -> MapMetrics;

    /// Reset all metrics
    fn reset_metrics(&self);

    /// Enable or disable metrics collection
    fn set_metrics_enabled(&self, enabled: bool);

    /// Check if metrics collection is enabled
    fn is_metrics_enabled(&self) -> bool;
}
