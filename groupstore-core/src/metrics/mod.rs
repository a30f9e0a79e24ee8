//! Metrics for membership operations
//!
//! Recorded through the `metrics` facade. Nothing is exported from here:
//! with no recorder installed every call is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Describe every metric this crate records
pub fn init_metrics() {
    describe_counter!("membership.add.accepted", "Members added to a group");
    describe_counter!(
        "membership.add.rejected",
        "Add requests refused (duplicate, self-membership, cycle, foreign store)"
    );
    describe_counter!("membership.remove.accepted", "Members removed from a group");
    describe_counter!("membership.remove.rejected", "Remove requests for non-members");

    describe_counter!("membership.cache.hit", "Membership cache hits");
    describe_counter!("membership.cache.miss", "Membership cache misses");
    describe_counter!("membership.cache.clear", "Membership cache invalidations");

    describe_histogram!(
        "membership.resolve.duration_ms",
        "Member set resolution duration in milliseconds"
    );
}

/// Record a counter metric
pub fn record_counter(name: &'static str, value: u64) {
    counter!(name).increment(value);
}

/// Record a histogram metric
pub fn record_histogram(name: &'static str, value: f64) {
    histogram!(name).record(value);
}

/// Timer for measuring operation duration
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Stop the timer and record the duration in milliseconds
    pub fn stop(self) {
        record_histogram(self.name, self.start.elapsed().as_secs_f64() * 1000.0);
    }
}
