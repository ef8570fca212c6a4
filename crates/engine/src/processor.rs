// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch processor: drains the queue and hands batches to the sink
//!
//! Two triggers feed the sink. Pool workers wait until a full batch is
//! queued, and a flusher thread drains whatever is queued on a fixed
//! interval. Each drained batch is private to the thread that drained it.

use crate::queue::BoundedQueue;
use crate::signal::StopSignal;
use crate::LifecycleError;
use ecl_adapters::{MetricsSink, PersistenceSink};
use ecl_core::Record;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Result of the bounded drain run at shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinalFlush {
    pub rounds: usize,
    pub drained: usize,
    pub persisted: usize,
}

/// Drains the queue into the persistence sink
pub struct BatchProcessor<S, M> {
    queue: Arc<BoundedQueue<Record>>,
    sink: Arc<S>,
    metrics: Arc<M>,
    batch_size: usize,
}

impl<S, M> Clone for BatchProcessor<S, M> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            sink: Arc::clone(&self.sink),
            metrics: Arc::clone(&self.metrics),
            batch_size: self.batch_size,
        }
    }
}

impl<S: PersistenceSink, M: MetricsSink> BatchProcessor<S, M> {
    pub fn new(
        queue: Arc<BoundedQueue<Record>>,
        sink: Arc<S>,
        metrics: Arc<M>,
        batch_size: usize,
    ) -> Self {
        Self {
            queue,
            sink,
            metrics,
            batch_size,
        }
    }

    /// Drain up to one batch and persist it, returning how many were drained
    pub fn flush(&self) -> usize {
        let start = Instant::now();
        let (drained, _) = self.drain_batch();
        self.metrics.record_flush_latency(start.elapsed());
        if drained > 0 {
            debug!(drained, "timed flush");
        }
        drained
    }

    /// Flush repeatedly until a round drains nothing or `rounds` is reached
    pub fn final_flush(&self, rounds: usize) -> FinalFlush {
        let mut result = FinalFlush::default();
        while result.rounds < rounds {
            let (drained, persisted) = self.drain_batch();
            result.rounds += 1;
            if drained == 0 {
                break;
            }
            result.drained += drained;
            if persisted {
                result.persisted += drained;
            }
        }
        result
    }

    /// Persist one batch. Failures are logged and counted, never retried.
    ///
    /// Returns whether the sink accepted the batch.
    pub fn persist(&self, batch: &[Record]) -> bool {
        if batch.is_empty() {
            return true;
        }

        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.sink.save_batch(batch)));
        let elapsed = start.elapsed();

        let saved = match outcome {
            Ok(Ok(())) => {
                self.metrics.increment_processed(batch.len() as u64);
                true
            }
            Ok(Err(e)) => {
                error!(records = batch.len(), error = %e, "batch discarded after save failure");
                self.metrics.increment_save_errors();
                false
            }
            Err(payload) => {
                error!(
                    records = batch.len(),
                    panic = panic_message(payload.as_ref()),
                    "batch discarded after sink panic"
                );
                self.metrics.increment_save_errors();
                false
            }
        };

        self.metrics.record_batch_size(batch.len());
        self.metrics.record_batch_latency(elapsed);
        self.metrics.gauge_queue_size(self.queue.size());
        saved
    }

    fn drain_batch(&self) -> (usize, bool) {
        let mut batch = Vec::with_capacity(self.batch_size.min(1024));
        let drained = self.queue.drain_into(&mut batch, self.batch_size);
        let saved = self.persist(&batch);
        (drained, saved)
    }

    /// Worker: persist full batches until stopped, then drain what is left
    fn run_worker(&self, stop: &StopSignal, poll_interval: Duration) {
        loop {
            if stop.is_triggered() {
                while self.drain_batch().0 > 0 {}
                return;
            }
            if self.queue.size() >= self.batch_size {
                self.drain_batch();
                continue;
            }
            stop.wait_timeout(poll_interval);
        }
    }

    fn run_flusher(&self, stop: &StopSignal, interval: Duration) {
        while !stop.wait_timeout(interval) {
            self.flush();
        }
    }

    /// Start `workers` pool threads plus the timed flusher
    pub fn spawn(
        &self,
        workers: usize,
        poll_interval: Duration,
        flush_interval: Duration,
    ) -> Result<WorkerPool, LifecycleError> {
        let mut pool = WorkerPool {
            stop: Arc::new(StopSignal::new()),
            handles: Vec::with_capacity(workers + 1),
        };

        for i in 0..workers {
            let processor = self.clone();
            let stop = Arc::clone(&pool.stop);
            pool.start(format!("ecl-worker-{i}"), move || {
                processor.run_worker(&stop, poll_interval)
            })?;
        }

        let processor = self.clone();
        let stop = Arc::clone(&pool.stop);
        pool.start("ecl-flusher".to_string(), move || {
            processor.run_flusher(&stop, flush_interval)
        })?;

        info!(
            workers,
            batch_size = self.batch_size,
            flush_interval_ms = flush_interval.as_millis() as u64,
            "batch workers started"
        );
        Ok(pool)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

/// Running worker and flusher threads
pub struct WorkerPool {
    stop: Arc<StopSignal>,
    handles: Vec<(String, JoinHandle<()>)>,
}

impl WorkerPool {
    fn start<F>(&mut self, name: String, f: F) -> Result<(), LifecycleError>
    where
        F: FnOnce() + Send + 'static,
    {
        match thread::Builder::new().name(name.clone()).spawn(f) {
            Ok(handle) => {
                self.handles.push((name, handle));
                Ok(())
            }
            Err(source) => {
                self.stop.trigger();
                Err(LifecycleError::Spawn { name, source })
            }
        }
    }

    /// Number of threads in the pool, flusher included
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Signal every thread and wait up to `timeout` for them to exit.
    ///
    /// Threads still running at the deadline are detached. Returns whether
    /// all threads exited.
    pub fn shutdown(mut self, timeout: Duration) -> bool {
        self.stop.trigger();
        let deadline = Instant::now() + timeout;

        let mut pending = std::mem::take(&mut self.handles);
        loop {
            let (finished, running): (Vec<_>, Vec<_>) =
                pending.into_iter().partition(|(_, h)| h.is_finished());
            for (name, handle) in finished {
                if handle.join().is_err() {
                    error!(thread = %name, "batch thread panicked");
                }
            }
            pending = running;

            if pending.is_empty() {
                return true;
            }
            if Instant::now() >= deadline {
                let names: Vec<_> = pending.iter().map(|(n, _)| n.as_str()).collect();
                warn!(
                    still_running = pending.len(),
                    threads = ?names,
                    timeout_ms = timeout.as_millis() as u64,
                    "batch threads did not stop in time, abandoning"
                );
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop.trigger();
    }
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
