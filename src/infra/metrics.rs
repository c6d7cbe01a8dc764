//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations to avoid mutex contention.
//! All counter updates are lock-free; reporting is the only operation
//! that needs synchronization (via atomic swap).
//!
//! NOTE: All atomics use Relaxed ordering intentionally—these are statistical
//! counters only. Do NOT use these atomics for coordination or logic decisions.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Exponential bucket boundaries (microseconds)
/// Buckets: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200
const BUCKET_BOUNDS: [u64; 10] = [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200];
pub const NUM_BUCKETS: usize = 11;

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

    // Upper bounds for each bucket (last bucket uses 2x the previous bound)
    const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
        [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200, 102400];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

/// Lock-free metrics collector
///
/// All recording operations are lock-free using atomics.
/// The `report()` method atomically swaps counters to get a consistent snapshot.
pub struct Metrics {
    /// Locations fetched from the provider (monotonic)
    locations_tracked: AtomicU64,
    /// Provider failures (monotonic)
    location_failures: AtomicU64,
    /// Completed reward passes (monotonic)
    reward_passes: AtomicU64,
    /// Reward passes aborted by an error (monotonic)
    reward_pass_failures: AtomicU64,
    /// Rewards granted (monotonic)
    rewards_awarded: AtomicU64,
    /// Rewards granted since last report (reset on report)
    rewards_since_report: AtomicU64,
    /// Batch tasks submitted to the reward pool (monotonic)
    batches_submitted: AtomicU64,
    /// Users carried by submitted batches (monotonic)
    users_batched: AtomicU64,
    /// Completed background tracking cycles (monotonic)
    tracking_cycles: AtomicU64,
    /// Oracle call latency histogram buckets (reset on report)
    oracle_latency_buckets: [AtomicU64; NUM_BUCKETS],
    /// Sum of oracle latencies (reset on report)
    oracle_latency_sum_us: AtomicU64,
    /// Max oracle latency (reset on report)
    oracle_latency_max_us: AtomicU64,
    /// Oracle calls since last report (reset on report)
    oracle_calls_since_report: AtomicU64,
    /// Last report time (only accessed from reporter, not atomic)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            locations_tracked: AtomicU64::new(0),
            location_failures: AtomicU64::new(0),
            reward_passes: AtomicU64::new(0),
            reward_pass_failures: AtomicU64::new(0),
            rewards_awarded: AtomicU64::new(0),
            rewards_since_report: AtomicU64::new(0),
            batches_submitted: AtomicU64::new(0),
            users_batched: AtomicU64::new(0),
            tracking_cycles: AtomicU64::new(0),
            oracle_latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            oracle_latency_sum_us: AtomicU64::new(0),
            oracle_latency_max_us: AtomicU64::new(0),
            oracle_calls_since_report: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    #[inline]
    pub fn record_location_tracked(&self) {
        self.locations_tracked.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_location_failure(&self) {
        self.location_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_reward_pass(&self, awarded: usize) {
        self.reward_passes.fetch_add(1, Ordering::Relaxed);
        self.rewards_awarded.fetch_add(awarded as u64, Ordering::Relaxed);
        self.rewards_since_report.fetch_add(awarded as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_reward_pass_failure(&self) {
        self.reward_pass_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_batch_submitted(&self, users: usize) {
        self.batches_submitted.fetch_add(1, Ordering::Relaxed);
        self.users_batched.fetch_add(users as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_tracking_cycle(&self) {
        self.tracking_cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Record reward oracle call latency (lock-free)
    #[inline]
    pub fn record_oracle_latency(&self, latency_us: u64) {
        self.oracle_calls_since_report.fetch_add(1, Ordering::Relaxed);
        self.oracle_latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.oracle_latency_buckets[bucket_index(latency_us)].fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.oracle_latency_max_us, latency_us);
    }

    pub fn locations_tracked(&self) -> u64 {
        self.locations_tracked.load(Ordering::Relaxed)
    }

    pub fn location_failures(&self) -> u64 {
        self.location_failures.load(Ordering::Relaxed)
    }

    pub fn reward_passes(&self) -> u64 {
        self.reward_passes.load(Ordering::Relaxed)
    }

    pub fn reward_pass_failures(&self) -> u64 {
        self.reward_pass_failures.load(Ordering::Relaxed)
    }

    pub fn rewards_awarded(&self) -> u64 {
        self.rewards_awarded.load(Ordering::Relaxed)
    }

    pub fn batches_submitted(&self) -> u64 {
        self.batches_submitted.load(Ordering::Relaxed)
    }

    pub fn users_batched(&self) -> u64 {
        self.users_batched.load(Ordering::Relaxed)
    }

    pub fn tracking_cycles(&self) -> u64 {
        self.tracking_cycles.load(Ordering::Relaxed)
    }

    /// Generate a summary and reset periodic counters
    pub fn report(&self, registered_users: usize) -> MetricsSummary {
        let rewards_count = self.rewards_since_report.swap(0, Ordering::Relaxed);
        let oracle_count = self.oracle_calls_since_report.swap(0, Ordering::Relaxed);
        let oracle_sum = self.oracle_latency_sum_us.swap(0, Ordering::Relaxed);
        let oracle_max = self.oracle_latency_max_us.swap(0, Ordering::Relaxed);
        let oracle_lat_buckets = swap_buckets(&self.oracle_latency_buckets);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let rewards_per_sec = if elapsed.as_secs_f64() > 0.0 {
            rewards_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        MetricsSummary {
            registered_users,
            locations_tracked: self.locations_tracked(),
            location_failures: self.location_failures(),
            reward_passes: self.reward_passes(),
            reward_pass_failures: self.reward_pass_failures(),
            rewards_awarded: self.rewards_awarded(),
            rewards_per_sec,
            batches_submitted: self.batches_submitted(),
            users_batched: self.users_batched(),
            tracking_cycles: self.tracking_cycles(),
            oracle_calls: oracle_count,
            oracle_lat_avg_us: if oracle_count > 0 { oracle_sum / oracle_count } else { 0 },
            oracle_lat_max_us: oracle_max,
            oracle_lat_p50_us: percentile_from_buckets(&oracle_lat_buckets, 0.50),
            oracle_lat_p99_us: percentile_from_buckets(&oracle_lat_buckets, 0.99),
            oracle_lat_buckets,
        }
    }
}

/// Summary of metrics for a reporting period
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub registered_users: usize,
    pub locations_tracked: u64,
    pub location_failures: u64,
    pub reward_passes: u64,
    pub reward_pass_failures: u64,
    pub rewards_awarded: u64,
    pub rewards_per_sec: f64,
    pub batches_submitted: u64,
    pub users_batched: u64,
    pub tracking_cycles: u64,
    /// Oracle calls in this period
    pub oracle_calls: u64,
    pub oracle_lat_avg_us: u64,
    pub oracle_lat_max_us: u64,
    pub oracle_lat_p50_us: u64,
    pub oracle_lat_p99_us: u64,
    /// Bounds: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200 µs
    pub oracle_lat_buckets: [u64; NUM_BUCKETS],
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            users = %self.registered_users,
            locations_tracked = %self.locations_tracked,
            location_failures = %self.location_failures,
            reward_passes = %self.reward_passes,
            reward_failures = %self.reward_pass_failures,
            rewards_awarded = %self.rewards_awarded,
            rewards_per_sec = format!("{:.1}", self.rewards_per_sec),
            batches = %self.batches_submitted,
            tracking_cycles = %self.tracking_cycles,
            oracle_calls = %self.oracle_calls,
            oracle_p99_us = %self.oracle_lat_p99_us,
            "metrics"
        );
    }
}
