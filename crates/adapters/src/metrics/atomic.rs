// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process metrics backed by atomics

use super::{names, MetricsSink};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

#[derive(Default)]
struct Timer {
    count: AtomicU64,
    total_us: AtomicU64,
    max_us: AtomicU64,
}

impl Timer {
    fn record(&self, elapsed: Duration) {
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_us.fetch_add(us, Ordering::Relaxed);
        self.max_us.fetch_max(us, Ordering::Relaxed);
    }

    fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            count: self.count.load(Ordering::Relaxed),
            total_us: self.total_us.load(Ordering::Relaxed),
            max_us: self.max_us.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of one timer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimerSnapshot {
    pub count: u64,
    pub total_us: u64,
    pub max_us: u64,
}

impl TimerSnapshot {
    pub fn mean_us(&self) -> u64 {
        self.total_us.checked_div(self.count).unwrap_or(0)
    }
}

/// Running count, sum and range of recorded values
struct Distribution {
    count: AtomicU64,
    total: AtomicU64,
    min: AtomicU64,
    max: AtomicU64,
}

impl Default for Distribution {
    fn default() -> Self {
        Self {
            count: AtomicU64::new(0),
            total: AtomicU64::new(0),
            min: AtomicU64::new(u64::MAX),
            max: AtomicU64::new(0),
        }
    }
}

impl Distribution {
    fn record(&self, value: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(value, Ordering::Relaxed);
        self.min.fetch_min(value, Ordering::Relaxed);
        self.max.fetch_max(value, Ordering::Relaxed);
    }

    fn snapshot(&self) -> DistributionSnapshot {
        let count = self.count.load(Ordering::Relaxed);
        DistributionSnapshot {
            count,
            total: self.total.load(Ordering::Relaxed),
            min: if count == 0 {
                0
            } else {
                self.min.load(Ordering::Relaxed)
            },
            max: self.max.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a value distribution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DistributionSnapshot {
    pub count: u64,
    pub total: u64,
    pub min: u64,
    pub max: u64,
}

impl DistributionSnapshot {
    pub fn mean(&self) -> u64 {
        self.total.checked_div(self.count).unwrap_or(0)
    }
}

/// Point-in-time view of every pipeline metric
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub dropped: u64,
    pub save_errors: u64,
    pub processed: u64,
    pub shutdown_flushed: u64,
    pub queue_size: u64,
    pub batch_size: DistributionSnapshot,
    pub offer_latency: TimerSnapshot,
    pub batch_latency: TimerSnapshot,
    pub flush_latency: TimerSnapshot,
}

impl MetricsSnapshot {
    /// Counter and gauge values keyed by their stable names
    pub fn counters(&self) -> [(&'static str, u64); 5] {
        [
            (names::QUEUE_DROPPED, self.dropped),
            (names::BATCH_SAVE_ERRORS, self.save_errors),
            (names::BATCH_PROCESSED, self.processed),
            (names::SHUTDOWN_FLUSHED, self.shutdown_flushed),
            (names::QUEUE_SIZE, self.queue_size),
        ]
    }
}

/// Lock-free metrics sink that keeps running totals in memory
#[derive(Default)]
pub struct AtomicMetrics {
    dropped: AtomicU64,
    save_errors: AtomicU64,
    processed: AtomicU64,
    shutdown_flushed: AtomicU64,
    queue_size: AtomicU64,
    batch_size: Distribution,
    offer_latency: Timer,
    batch_latency: Timer,
    flush_latency: Timer,
    shut_down: AtomicBool,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            dropped: self.dropped.load(Ordering::Relaxed),
            save_errors: self.save_errors.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            shutdown_flushed: self.shutdown_flushed.load(Ordering::Relaxed),
            queue_size: self.queue_size.load(Ordering::Relaxed),
            batch_size: self.batch_size.snapshot(),
            offer_latency: self.offer_latency.snapshot(),
            batch_latency: self.batch_latency.snapshot(),
            flush_latency: self.flush_latency.snapshot(),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

impl MetricsSink for AtomicMetrics {
    fn increment_dropped(&self, count: u64) {
        self.dropped.fetch_add(count, Ordering::Relaxed);
    }

    fn increment_save_errors(&self) {
        self.save_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn increment_processed(&self, count: u64) {
        self.processed.fetch_add(count, Ordering::Relaxed);
    }

    fn increment_shutdown_flushed(&self, count: u64) {
        self.shutdown_flushed.fetch_add(count, Ordering::Relaxed);
    }

    fn record_batch_size(&self, size: usize) {
        self.batch_size.record(size as u64);
    }

    fn record_offer_latency(&self, elapsed: Duration) {
        self.offer_latency.record(elapsed);
    }

    fn record_batch_latency(&self, elapsed: Duration) {
        self.batch_latency.record(elapsed);
    }

    fn record_flush_latency(&self, elapsed: Duration) {
        self.flush_latency.record(elapsed);
    }

    fn gauge_queue_size(&self, size: usize) {
        self.queue_size.store(size as u64, Ordering::Relaxed);
    }

    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;
