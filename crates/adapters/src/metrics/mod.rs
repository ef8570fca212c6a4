// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metrics adapters for the ingestion pipeline

mod atomic;

pub use atomic::{AtomicMetrics, DistributionSnapshot, MetricsSnapshot, TimerSnapshot};

use std::time::Duration;

/// Stable metric keys
pub mod names {
    /// Counter: records refused because the queue was full or closed
    pub const QUEUE_DROPPED: &str = "entitylog.queue.dropped";
    /// Gauge: records waiting in the queue
    pub const QUEUE_SIZE: &str = "entitylog.queue.size";
    /// Timer: time spent handing a record to the queue
    pub const QUEUE_OFFER_LATENCY: &str = "entitylog.queue.offer.latency";
    /// Counter: batches the persistence sink rejected
    pub const BATCH_SAVE_ERRORS: &str = "entitylog.batch.save.errors";
    /// Counter: records persisted
    pub const BATCH_PROCESSED: &str = "entitylog.batch.processed";
    /// Distribution: records per persisted batch
    pub const BATCH_SIZE: &str = "entitylog.batch.size";
    /// Timer: time spent persisting one batch
    pub const BATCH_PROCESSING_LATENCY: &str = "entitylog.batch.processing.latency";
    /// Timer: time spent in one timed flush
    pub const FLUSH_LATENCY: &str = "entitylog.flush.latency";
    /// Counter: records persisted by the shutdown flush
    pub const SHUTDOWN_FLUSHED: &str = "entitylog.shutdown.flushed.count";
}

/// Receiver of pipeline measurements.
///
/// Called from producer and worker threads; implementations must not block.
pub trait MetricsSink: Send + Sync + 'static {
    fn increment_dropped(&self, count: u64);

    fn increment_save_errors(&self);

    fn increment_processed(&self, count: u64);

    fn increment_shutdown_flushed(&self, count: u64);

    fn record_batch_size(&self, size: usize);

    fn record_offer_latency(&self, elapsed: Duration);

    fn record_batch_latency(&self, elapsed: Duration);

    fn record_flush_latency(&self, elapsed: Duration);

    fn gauge_queue_size(&self, size: usize);

    /// Release resources once the pipeline has stopped
    fn shutdown(&self) {}
}

impl<M: MetricsSink> MetricsSink for std::sync::Arc<M> {
    fn increment_dropped(&self, count: u64) {
        (**self).increment_dropped(count)
    }

    fn increment_save_errors(&self) {
        (**self).increment_save_errors()
    }

    fn increment_processed(&self, count: u64) {
        (**self).increment_processed(count)
    }

    fn increment_shutdown_flushed(&self, count: u64) {
        (**self).increment_shutdown_flushed(count)
    }

    fn record_batch_size(&self, size: usize) {
        (**self).record_batch_size(size)
    }

    fn record_offer_latency(&self, elapsed: Duration) {
        (**self).record_offer_latency(elapsed)
    }

    fn record_batch_latency(&self, elapsed: Duration) {
        (**self).record_batch_latency(elapsed)
    }

    fn record_flush_latency(&self, elapsed: Duration) {
        (**self).record_flush_latency(elapsed)
    }

    fn gauge_queue_size(&self, size: usize) {
        (**self).gauge_queue_size(size)
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }
}

/// Metrics sink that discards everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpMetrics;

impl MetricsSink for NoOpMetrics {
    fn increment_dropped(&self, _count: u64) {}
    fn increment_save_errors(&self) {}
    fn increment_processed(&self, _count: u64) {}
    fn increment_shutdown_flushed(&self, _count: u64) {}
    fn record_batch_size(&self, _size: usize) {}
    fn record_offer_latency(&self, _elapsed: Duration) {}
    fn record_batch_latency(&self, _elapsed: Duration) {}
    fn record_flush_latency(&self, _elapsed: Duration) {}
    fn gauge_queue_size(&self, _size: usize) {}
}
