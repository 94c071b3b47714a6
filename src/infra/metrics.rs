//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics so the headless runner's reporter task can read while the
//! tick loop records. Reporting swaps the per-interval counters.
//!
//! NOTE: All atomics use Relaxed ordering intentionally. These are statistical
//! counters only and must never drive simulation logic.

use crate::domain::types::Regime;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Tick latency bucket boundaries (microseconds)
/// Buckets: ≤10, ≤20, ≤50, ≤100, ≤200, ≤500, ≤1000, ≤2000, ≤5000, ≤10000, >10000
const BUCKET_BOUNDS: [u64; 10] = [10, 20, 50, 100, 200, 500, 1000, 2000, 5000, 10000];
const NUM_BUCKETS: usize = 11;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Swap all buckets to zero and return their values
#[inline]
fn swap_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.swap(0, Ordering::Relaxed);
    }
    result
}

/// Compute percentile from histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile) as u64;
    let mut cumulative = 0u64;

    // Last bucket reports 2x the previous bound
    const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
        [10, 20, 50, 100, 200, 500, 1000, 2000, 5000, 10000, 20000];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

#[inline]
fn regime_code(regime: Regime) -> u64 {
    match regime {
        Regime::Normal => 0,
        Regime::Wear => 1,
        Regime::Jam => 2,
    }
}

#[inline]
fn regime_from_code(code: u64) -> Regime {
    match code {
        1 => Regime::Wear,
        2 => Regime::Jam,
        _ => Regime::Normal,
    }
}

/// Lock-free metrics collector
pub struct Metrics {
    /// Total ticks ever processed (monotonic)
    ticks_total: AtomicU64,
    /// Ticks since last report (reset on report)
    ticks_since_report: AtomicU64,
    /// Sum of tick latencies in microseconds (reset on report)
    tick_latency_sum_us: AtomicU64,
    /// Max tick latency in microseconds (reset on report)
    tick_latency_max_us: AtomicU64,
    /// Tick latency histogram buckets (reset on report)
    tick_latency_buckets: [AtomicU64; NUM_BUCKETS],
    /// Objects created (monotonic)
    objects_spawned: AtomicU64,
    /// Objects counted at the sensor gate (monotonic)
    objects_counted: AtomicU64,
    /// Objects removed past the exit (monotonic)
    objects_culled: AtomicU64,
    /// Ticks where spawning was suppressed by a jam (monotonic)
    spawn_suppressed: AtomicU64,
    /// Operator regime changes (monotonic)
    regime_changes: AtomicU64,
    /// Current regime (0=normal, 1=wear, 2=jam)
    regime: AtomicU64,
    /// Live objects after the last tick
    live_objects: AtomicU64,
    /// Highest live object count seen (monotonic)
    peak_live_objects: AtomicU64,
    /// Snapshot lines written (monotonic)
    egress_written: AtomicU64,
    /// Snapshot writes that failed (monotonic)
    egress_failed: AtomicU64,
    /// Last report time (only accessed from reporter)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            ticks_total: AtomicU64::new(0),
            ticks_since_report: AtomicU64::new(0),
            tick_latency_sum_us: AtomicU64::new(0),
            tick_latency_max_us: AtomicU64::new(0),
            tick_latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            objects_spawned: AtomicU64::new(0),
            objects_counted: AtomicU64::new(0),
            objects_culled: AtomicU64::new(0),
            spawn_suppressed: AtomicU64::new(0),
            regime_changes: AtomicU64::new(0),
            regime: AtomicU64::new(regime_code(Regime::Normal)),
            live_objects: AtomicU64::new(0),
            peak_live_objects: AtomicU64::new(0),
            egress_written: AtomicU64::new(0),
            egress_failed: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record a completed tick with its processing latency and live object count
    #[inline]
    pub fn record_tick(&self, latency_us: u64, live_objects: usize) {
        self.ticks_total.fetch_add(1, Ordering::Relaxed);
        self.ticks_since_report.fetch_add(1, Ordering::Relaxed);
        self.tick_latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);

        let bucket = bucket_index(latency_us);
        self.tick_latency_buckets[bucket].fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.tick_latency_max_us, latency_us);

        let live = live_objects as u64;
        self.live_objects.store(live, Ordering::Relaxed);
        update_atomic_max(&self.peak_live_objects, live);
    }

    #[inline]
    pub fn record_spawn(&self) {
        self.objects_spawned.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_counted(&self, n: u64) {
        self.objects_counted.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_culled(&self, n: u64) {
        self.objects_culled.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_spawn_suppressed(&self) {
        self.spawn_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_regime_change(&self, regime: Regime) {
        self.regime_changes.fetch_add(1, Ordering::Relaxed);
        self.regime.store(regime_code(regime), Ordering::Relaxed);
    }

    #[inline]
    pub fn record_egress(&self, ok: bool) {
        if ok {
            self.egress_written.fetch_add(1, Ordering::Relaxed);
        } else {
            self.egress_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn ticks_total(&self) -> u64 {
        self.ticks_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn objects_spawned(&self) -> u64 {
        self.objects_spawned.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn objects_counted(&self) -> u64 {
        self.objects_counted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn objects_culled(&self) -> u64 {
        self.objects_culled.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn peak_live_objects(&self) -> u64 {
        self.peak_live_objects.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn regime(&self) -> Regime {
        regime_from_code(self.regime.load(Ordering::Relaxed))
    }

    /// Build a summary, resetting the per-interval counters
    pub fn report(&self) -> MetricsSummary {
        let now = Instant::now();
        let elapsed_secs = {
            let mut last = self.last_report_time.lock();
            let elapsed = now.duration_since(*last).as_secs_f64();
            *last = now;
            elapsed
        };

        let ticks = self.ticks_since_report.swap(0, Ordering::Relaxed);
        let ticks_per_sec = if elapsed_secs > 0.0 { ticks as f64 / elapsed_secs } else { 0.0 };

        let lat_buckets = swap_buckets(&self.tick_latency_buckets);
        let lat_sum = self.tick_latency_sum_us.swap(0, Ordering::Relaxed);
        let lat_max = self.tick_latency_max_us.swap(0, Ordering::Relaxed);
        let lat_count: u64 = lat_buckets.iter().sum();
        let avg_tick_latency_us = if lat_count > 0 { lat_sum / lat_count } else { 0 };

        MetricsSummary {
            ticks_total: self.ticks_total.load(Ordering::Relaxed),
            ticks_per_sec,
            avg_tick_latency_us,
            max_tick_latency_us: lat_max,
            lat_p50_us: percentile_from_buckets(&lat_buckets, 0.50),
            lat_p95_us: percentile_from_buckets(&lat_buckets, 0.95),
            lat_p99_us: percentile_from_buckets(&lat_buckets, 0.99),
            lat_buckets,
            regime: self.regime(),
            live_objects: self.live_objects.load(Ordering::Relaxed),
            peak_live_objects: self.peak_live_objects.load(Ordering::Relaxed),
            objects_spawned: self.objects_spawned.load(Ordering::Relaxed),
            objects_counted: self.objects_counted.load(Ordering::Relaxed),
            objects_culled: self.objects_culled.load(Ordering::Relaxed),
            spawn_suppressed: self.spawn_suppressed.load(Ordering::Relaxed),
            regime_changes: self.regime_changes.load(Ordering::Relaxed),
            egress_written: self.egress_written.load(Ordering::Relaxed),
            egress_failed: self.egress_failed.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct MetricsSummary {
    pub ticks_total: u64,
    pub ticks_per_sec: f64,
    pub avg_tick_latency_us: u64,
    pub max_tick_latency_us: u64,
    /// Bounds: ≤10, ≤20, ≤50, ≤100, ≤200, ≤500, ≤1000, ≤2000, ≤5000, ≤10000, >10000 µs
    pub lat_buckets: [u64; NUM_BUCKETS],
    pub lat_p50_us: u64,
    pub lat_p95_us: u64,
    pub lat_p99_us: u64,
    pub regime: Regime,
    pub live_objects: u64,
    pub peak_live_objects: u64,
    pub objects_spawned: u64,
    pub objects_counted: u64,
    pub objects_culled: u64,
    pub spawn_suppressed: u64,
    pub regime_changes: u64,
    pub egress_written: u64,
    pub egress_failed: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            ticks_total = %self.ticks_total,
            ticks_per_sec = format!("{:.1}", self.ticks_per_sec),
            avg_tick_us = %self.avg_tick_latency_us,
            max_tick_us = %self.max_tick_latency_us,
            p99_us = %self.lat_p99_us,
            regime = %self.regime.as_str(),
            live = %self.live_objects,
            peak_live = %self.peak_live_objects,
            spawned = %self.objects_spawned,
            counted = %self.objects_counted,
            culled = %self.objects_culled,
            egress_failed = %self.egress_failed,
            "metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.ticks_total(), 0);
        assert_eq!(metrics.objects_spawned(), 0);
        assert_eq!(metrics.regime(), Regime::Normal);
    }

    #[test]
    fn test_record_tick() {
        let metrics = Metrics::new();
        metrics.record_tick(15, 3);
        metrics.record_tick(150, 5);
        metrics.record_tick(40, 2);

        let summary = metrics.report();
        assert_eq!(summary.ticks_total, 3);
        assert_eq!(summary.avg_tick_latency_us, 68);
        assert_eq!(summary.max_tick_latency_us, 150);
        assert_eq!(summary.live_objects, 2);
        assert_eq!(summary.peak_live_objects, 5);
        assert_eq!(summary.lat_buckets[1], 1); // 15us -> ≤20
        assert_eq!(summary.lat_buckets[2], 1); // 40us -> ≤50
        assert_eq!(summary.lat_buckets[4], 1); // 150us -> ≤200
    }

    #[test]
    fn test_report_resets_interval_counters() {
        let metrics = Metrics::new();
        metrics.record_tick(100, 1);
        let _ = metrics.report();

        let summary = metrics.report();
        assert_eq!(summary.ticks_total, 1); // monotonic
        assert_eq!(summary.max_tick_latency_us, 0);
        assert_eq!(summary.lat_buckets.iter().sum::<u64>(), 0);
        assert_eq!(summary.lat_p99_us, 0);
    }

    #[test]
    fn test_object_counters() {
        let metrics = Metrics::new();
        metrics.record_spawn();
        metrics.record_spawn();
        metrics.record_counted(1);
        metrics.record_culled(1);
        metrics.record_spawn_suppressed();
        metrics.record_egress(true);
        metrics.record_egress(false);

        let summary = metrics.report();
        assert_eq!(summary.objects_spawned, 2);
        assert_eq!(summary.objects_counted, 1);
        assert_eq!(summary.objects_culled, 1);
        assert_eq!(summary.spawn_suppressed, 1);
        assert_eq!(summary.egress_written, 1);
        assert_eq!(summary.egress_failed, 1);
    }

    #[test]
    fn test_regime_change() {
        let metrics = Metrics::new();
        metrics.record_regime_change(Regime::Jam);
        assert_eq!(metrics.regime(), Regime::Jam);
        metrics.record_regime_change(Regime::Wear);
        assert_eq!(metrics.regime(), Regime::Wear);
        assert_eq!(metrics.report().regime_changes, 2);
    }

    #[test]
    fn test_bucket_index() {
        assert_eq!(bucket_index(0), 0);
        assert_eq!(bucket_index(10), 0);
        assert_eq!(bucket_index(11), 1);
        assert_eq!(bucket_index(10000), 9);
        assert_eq!(bucket_index(10001), 10);
    }

    #[test]
    fn test_percentile_from_buckets() {
        let mut buckets = [0u64; NUM_BUCKETS];
        buckets[0] = 90;
        buckets[5] = 10;
        assert_eq!(percentile_from_buckets(&buckets, 0.50), 10);
        assert_eq!(percentile_from_buckets(&buckets, 0.99), 500);
    }
}
