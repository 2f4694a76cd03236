//! Sliding window aggregation of call outcomes.
//!
//! Two kinds of window are supported: a count-based ring buffer of the last
//! `N` calls, and a time-based ring buffer of fixed-width buckets covering
//! the last `duration`. Both maintain running totals incrementally so that
//! recording a call and reading a snapshot are both O(1) regardless of
//! window size.

use crate::clock::Clock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A single recorded call outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Sample {
    failed: bool,
    slow: bool,
}

/// Running totals over the calls currently held in a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Totals {
    calls: u32,
    failed: u32,
    slow: u32,
    slow_failed: u32,
}

impl Totals {
    fn add(&mut self, sample: Sample) {
        self.calls += 1;
        if sample.failed {
            self.failed += 1;
        }
        if sample.slow {
            self.slow += 1;
        }
        if sample.failed && sample.slow {
            self.slow_failed += 1;
        }
    }

    fn remove(&mut self, sample: Sample) {
        self.calls -= 1;
        if sample.failed {
            self.failed -= 1;
        }
        if sample.slow {
            self.slow -= 1;
        }
        if sample.failed && sample.slow {
            self.slow_failed -= 1;
        }
    }
}

/// A point-in-time view of a window's aggregated call outcomes.
///
/// `failure_rate_percent` and `slow_call_rate_percent` return `None` (the
/// UNKNOWN sentinel) when fewer than the configured minimum number of calls
/// have been recorded; a rate computed from too few samples is considered
/// not statistically meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    total_calls: u32,
    failed_calls: u32,
    slow_calls: u32,
    slow_failed_calls: u32,
    total_duration: Duration,
    minimum_number_of_calls: u32,
}

impl Snapshot {
    /// Total number of calls currently represented in the window.
    pub fn total_calls(&self) -> u32 {
        self.total_calls
    }

    /// Number of calls recorded as failed.
    pub fn failed_calls(&self) -> u32 {
        self.failed_calls
    }

    /// Number of calls recorded as slow.
    pub fn slow_calls(&self) -> u32 {
        self.slow_calls
    }

    /// Number of calls that were both slow and failed. A call contributes
    /// to this counter in addition to (not instead of) `failed_calls` and
    /// `slow_calls`, since slow and failed are independent dimensions of a
    /// single outcome.
    pub fn slow_failed_calls(&self) -> u32 {
        self.slow_failed_calls
    }

    /// Wall-clock span currently covered by the window (time-based windows
    /// report their configured duration; count-based windows report the
    /// duration elapsed since the oldest retained call was recorded).
    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }

    fn below_floor(&self) -> bool {
        self.total_calls < self.minimum_number_of_calls
    }

    /// Failure rate as an integer percentage (0-100), or `None` if the
    /// window has not yet accumulated the minimum number of calls.
    pub fn failure_rate_percent(&self) -> Option<u32> {
        if self.below_floor() || self.total_calls == 0 {
            return None;
        }
        Some((self.failed_calls * 100) / self.total_calls)
    }

    /// Slow-call rate as an integer percentage (0-100), or `None` if the
    /// window has not yet accumulated the minimum number of calls.
    pub fn slow_call_rate_percent(&self) -> Option<u32> {
        if self.below_floor() || self.total_calls == 0 {
            return None;
        }
        Some((self.slow_calls * 100) / self.total_calls)
    }
}

struct CountBasedWindow {
    capacity: usize,
    samples: VecDeque<Sample>,
    totals: Totals,
    oldest_at: Option<Instant>,
}

impl CountBasedWindow {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
            totals: Totals::default(),
            oldest_at: None,
        }
    }

    fn record(&mut self, sample: Sample, now: Instant) {
        if self.samples.len() == self.capacity {
            if let Some(evicted) = self.samples.pop_front() {
                self.totals.remove(evicted);
            }
        }
        self.samples.push_back(sample);
        self.totals.add(sample);
        if self.oldest_at.is_none() || self.samples.len() == 1 {
            self.oldest_at = Some(now);
        }
    }

    fn reset(&mut self) {
        self.samples.clear();
        self.totals = Totals::default();
        self.oldest_at = None;
    }

    fn snapshot(&self, now: Instant, minimum_number_of_calls: u32) -> Snapshot {
        Snapshot {
            total_calls: self.totals.calls,
            failed_calls: self.totals.failed,
            slow_calls: self.totals.slow,
            slow_failed_calls: self.totals.slow_failed,
            total_duration: self
                .oldest_at
                .map(|oldest| now.saturating_duration_since(oldest))
                .unwrap_or_default(),
            minimum_number_of_calls,
        }
    }
}

/// A single fixed-width time bucket, lazily reset when a stale epoch is reused.
#[derive(Clone, Copy)]
struct Bucket {
    epoch: u64,
    totals: Totals,
}

struct TimeBasedWindow {
    bucket_width: Duration,
    buckets: Vec<Bucket>,
    started_at: Instant,
}

impl TimeBasedWindow {
    fn new(duration: Duration, bucket_count: usize, started_at: Instant) -> Self {
        let bucket_count = bucket_count.max(1);
        let bucket_width = duration / bucket_count as u32;
        Self {
            bucket_width: bucket_width.max(Duration::from_millis(1)),
            buckets: vec![
                Bucket {
                    epoch: u64::MAX,
                    totals: Totals::default(),
                };
                bucket_count
            ],
            started_at,
        }
    }

    fn epoch_for(&self, at: Instant) -> u64 {
        let elapsed = at.saturating_duration_since(self.started_at);
        (elapsed.as_nanos() / self.bucket_width.as_nanos().max(1)) as u64
    }

    fn bucket_index(&self, epoch: u64) -> usize {
        (epoch as usize) % self.buckets.len()
    }

    fn record(&mut self, sample: Sample, now: Instant) {
        let epoch = self.epoch_for(now);
        let idx = self.bucket_index(epoch);
        let bucket = &mut self.buckets[idx];
        if bucket.epoch != epoch {
            *bucket = Bucket {
                epoch,
                totals: Totals::default(),
            };
        }
        bucket.totals.add(sample);
    }

    fn reset(&mut self) {
        for bucket in &mut self.buckets {
            bucket.epoch = u64::MAX;
            bucket.totals = Totals::default();
        }
    }

    fn snapshot(&self, now: Instant, minimum_number_of_calls: u32) -> Snapshot {
        let current_epoch = self.epoch_for(now);
        let oldest_valid_epoch = current_epoch.saturating_sub(self.buckets.len() as u64 - 1);
        let mut totals = Totals::default();
        for bucket in &self.buckets {
            if bucket.epoch != u64::MAX && bucket.epoch >= oldest_valid_epoch {
                totals.calls += bucket.totals.calls;
                totals.failed += bucket.totals.failed;
                totals.slow += bucket.totals.slow;
                totals.slow_failed += bucket.totals.slow_failed;
            }
        }
        Snapshot {
            total_calls: totals.calls,
            failed_calls: totals.failed,
            slow_calls: totals.slow,
            slow_failed_calls: totals.slow_failed,
            total_duration: self.bucket_width * self.buckets.len() as u32,
            minimum_number_of_calls,
        }
    }
}

enum Kind {
    CountBased(CountBasedWindow),
    TimeBased(TimeBasedWindow),
}

/// The sliding window used by a circuit breaker to aggregate recent call
/// outcomes into a failure rate and a slow-call rate.
pub struct MetricsWindow {
    kind: Kind,
    minimum_number_of_calls: u32,
    clock: Arc<dyn Clock>,
}

impl MetricsWindow {
    /// Creates a count-based window holding the last `size` calls.
    pub fn count_based(size: usize, minimum_number_of_calls: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            kind: Kind::CountBased(CountBasedWindow::new(size)),
            minimum_number_of_calls,
            clock,
        }
    }

    /// Creates a time-based window covering `duration`, split into
    /// `bucket_count` fixed-width buckets.
    pub fn time_based(
        duration: Duration,
        bucket_count: usize,
        minimum_number_of_calls: u32,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let now = clock.now();
        Self {
            kind: Kind::TimeBased(TimeBasedWindow::new(duration, bucket_count, now)),
            minimum_number_of_calls,
            clock,
        }
    }

    /// Records a call outcome. `failed` and `slow` are independent
    /// dimensions: a call may be slow and successful, slow and failed, or
    /// neither.
    pub fn record(&mut self, failed: bool, slow: bool) {
        let now = self.clock.now();
        let sample = Sample { failed, slow };
        match &mut self.kind {
            Kind::CountBased(window) => window.record(sample, now),
            Kind::TimeBased(window) => window.record(sample, now),
        }
    }

    /// Clears all recorded calls, as happens on a state transition.
    pub fn reset(&mut self) {
        match &mut self.kind {
            Kind::CountBased(window) => window.reset(),
            Kind::TimeBased(window) => window.reset(),
        }
    }

    /// Returns the current aggregate snapshot.
    pub fn snapshot(&self) -> Snapshot {
        let now = self.clock.now();
        match &self.kind {
            Kind::CountBased(window) => window.snapshot(now, self.minimum_number_of_calls),
            Kind::TimeBased(window) => window.snapshot(now, self.minimum_number_of_calls),
        }
    }
}
