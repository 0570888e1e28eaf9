//! # Server Metrics
//!
//! Provide lightweight counters and a latency histogram to compute
//! QPS, error rate, and tail latency for the user-space server.
//!
//! ## Design Principles
//! 1. **Accumulator Pattern**: Use atomic counters to aggregate events cheaply.
//! 2. **Fixed Buckets**: Keep histogram buckets in a contiguous array for cache locality.
//! 3. **Zero-Cost Access**: Expose snapshots as plain structs without heap work.
//! 4. **FFI-Free**: Pure Rust types keep the hot path safe and portable.
//!
//! ## Notes
//! - Metrics are intentionally decoupled from the request path to keep the
//!   server fast; wiring and sampling policy are left to the caller.
//! - Bucket boundaries are expressed in microseconds and can be tuned later.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Default latency bucket boundaries in microseconds.
///
/// These are coarse on purpose to keep bucket scans short (performance-first).
pub const DEFAULT_LATENCY_BUCKETS_US: [u64; 12] =
    [1, 2, 5, 10, 20, 50, 100, 200, 500, 1_000, 2_000, 5_000];

/// Snapshot of all server metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Total number of requests observed.
    pub requests_total: u64,
    /// Total number of error responses observed.
    pub errors_total: u64,
    /// Current in-flight requests.
    pub inflight: u64,
    /// Latency histogram snapshot.
    pub latency: LatencySnapshot,
}

/// Snapshot of the latency histogram.
#[derive(Debug, Clone)]
pub struct LatencySnapshot {
    /// Bucket boundaries in microseconds.
    pub bounds_us: Vec<u64>,
    /// Bucket counts, including the overflow bucket at the end.
    pub buckets: Vec<u64>,
    /// Total number of samples.
    pub samples: u64,
    /// Sum of latencies in microseconds.
    pub sum_us: u64,
}

/// Thread-safe metrics aggregator for the server.
///
/// The struct is intentionally small and uses `AtomicU64` so record calls are
/// zero-allocation and cheap. `Ordering::Relaxed` is sufficient because we do
/// not require cross-field ordering, only eventual consistency.
pub struct Metrics {
    requests_total: AtomicU64,
    errors_total: AtomicU64,
    inflight: AtomicU64,
    latency: LatencyHistogram,
}

impl Metrics {
    /// Creates a new metrics aggregator with the default latency buckets.
    pub fn new() -> Self {
        Metrics{
            requests_total: AtomicU64::new(0),
            errors_total: AtomicU64::new(0),
            inflight: AtomicU64::new(0),
            latency: LatencyHistogram::new(DEFAULT_LATENCY_BUCKETS_US.to_vec()),
        }
    }

    /// Creates a new metrics aggregator with custom latency bucket boundaries.
    ///
    /// The boundaries must be sorted ascending and represent microseconds.
    ///
    /// **Input**: `bounds_us` (ascending microsecond thresholds).
    /// **Output**: a `Metrics` instance configured with those buckets.
    pub fn with_latency_buckets(bounds_us: Vec<u64>) -> Self {
        Metrics{
            requests_total: AtomicU64::new(0),
            errors_total: AtomicU64::new(0),
            inflight: AtomicU64::new(0),
            latency: LatencyHistogram::new(bounds_us),
        }
    }

    /// Records the start of a request.
    ///
    /// Call this when a request is accepted to increment totals and in-flight.
    pub fn record_request_start(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.inflight.fetch_add(1, Ordering::Relaxed);
    }

    /// Records the end of a request.
    ///
    /// Call this on completion to decrement in-flight and capture latency.
    ///
    /// **Input**: `latency` measured for the request.
    /// **Output**: none (side-effects only).
    ///
    /// **Logic**:
    /// 1. Decrement `inflight`.
    /// 2. Record the latency into the histogram.
    pub fn record_request_end(&self, latency: Duration) {
        self.inflight.fetch_sub(1, Ordering::Relaxed);
        self.latency.record(latency);
    }

    /// Records an error response.
    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a snapshot of all counters and histogram buckets.
    ///
    /// **Input**: none.
    /// **Output**: `MetricsSnapshot` with point-in-time values.
    ///
    /// **Logic**:
    /// 1. Load atomic counters.
    /// 2. Ask the histogram for a snapshot.
    /// 3. Return a struct with those values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            errors_total: self.errors_total.load(Ordering::Relaxed),
            inflight: self.inflight.load(Ordering::Relaxed),
            latency: self.latency.snapshot(),
        }
    }
}

/// Fixed-bucket latency histogram.
///
/// Uses a linear scan to pick buckets; this is O(buckets) but the list is small
/// and stays hot in cache. If you need faster bucket selection, replace with a
/// binary search or precomputed lookup table.
pub struct LatencyHistogram {
    bounds_us: Vec<u64>,
    buckets: Vec<AtomicU64>,
    sum_us: AtomicU64,
    samples: AtomicU64,
}

impl LatencyHistogram {
    /// Creates a histogram with explicit bucket boundaries (microseconds).
    ///
    /// **Input**: `bounds_us` sorted ascending.
    /// **Output**: histogram with `bounds_us.len() + 1` buckets (last is overflow).
    ///
    /// **Logic**:
    /// 1. Allocate a vector of `AtomicU64` sized to `bounds_us.len() + 1`.
    /// 2. Zero `samples` and `sum_us`.
    pub fn new(bounds_us: Vec<u64>) -> Self {
        let bucket_count = bounds_us.len() + 1;
        let mut buckets = Vec::with_capacity(bucket_count);
        buckets.resize_with(bucket_count, || AtomicU64::new(0));

        LatencyHistogram {
            bounds_us,
            buckets,
            sum_us: AtomicU64::new(0),
            samples: AtomicU64::new(0),
        }
    }

    /// Records a latency measurement into the histogram.
    ///
    /// Caller passes `Duration` to avoid unit ambiguity.
    ///
    /// **Input**: latency as `Duration`.
    /// **Output**: none (side-effects only).
    ///
    /// **Logic**:
    /// 1. Convert to microseconds.
    /// 2. Increment `samples` and add to `sum_us`.
    /// 3. Find the first bucket where `micros <= bound`, otherwise use overflow.
    /// 4. Increment that bucket atomically.
    pub fn record(&self, latency: Duration) {
        let micros = latency.as_micros().min(u64::MAX as u128) as u64;
        self.samples.fetch_add(1, Ordering::Relaxed);
        self.sum_us.fetch_add(micros, Ordering::Relaxed);

        let bucket = self
            .bounds_us
            .iter()
            .position(|&bound| micros <= bound)
            .unwrap_or(self.buckets.len() - 1);

        self.buckets[bucket].fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of the histogram.
    ///
    /// **Input**: none.
    /// **Output**: `LatencySnapshot` with bucket counts, total samples, and sum.
    ///
    /// **Logic**:
    /// 1. Load each bucket counter into a `Vec<u64>`.
    /// 2. Load `samples` and `sum_us`.
    /// 3. Clone bucket bounds into the snapshot.
    pub fn snapshot(&self) -> LatencySnapshot {
        LatencySnapshot {
            bounds_us: self.bounds_us.clone(),
            buckets: self.buckets.iter().map(|b| b.load(Ordering::Relaxed)).collect(),
            samples: self.samples.load(Ordering::Relaxed),
            sum_us: self.sum_us.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_requests_and_errors() {
        let metrics = Metrics::new();
        metrics.record_request_start();
        metrics.record_request_end(Duration::from_micros(3));
        metrics.record_error();

        let snap = metrics.snapshot();
        assert_eq!(snap.requests_total, 1);
        assert_eq!(snap.errors_total, 1);
        assert_eq!(snap.inflight, 0);
        assert_eq!(snap.latency.samples, 1);
    }

    #[test]
    fn histogram_buckets_by_bound() {
        let hist = LatencyHistogram::new(vec![10, 100]);
        hist.record(Duration::from_micros(5));
        hist.record(Duration::from_micros(50));
        hist.record(Duration::from_micros(500));

        let snap = hist.snapshot();
        assert_eq!(snap.buckets, vec![1, 1, 1]);
        assert_eq!(snap.samples, 3);
        assert_eq!(snap.sum_us, 555);
    }
}
