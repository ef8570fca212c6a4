// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline lifecycle: startup, record intake and ordered shutdown

use crate::processor::{BatchProcessor, FinalFlush, WorkerPool};
use crate::queue::BoundedQueue;
use crate::LifecycleError;
use ecl_adapters::{MetricsSink, PersistenceSink};
use ecl_core::{Checkpoint, PipelineConfig, Record};
use ecl_storage::{DurableLog, WalError};
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Lifecycle state of a [`Coordinator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            State::Stopped => "stopped",
            State::Starting => "starting",
            State::Running => "running",
            State::Stopping => "stopping",
        })
    }
}

/// What happened to a record handed to [`Coordinator::log_change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logged {
    /// Durable in the WAL and waiting for a batch
    Queued,
    /// Durable in the WAL but refused by a full or closed queue
    Dropped,
    /// Entity excluded from capture; nothing written
    Skipped,
}

/// Outcome of [`Coordinator::stop`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Every batch thread exited before the worker timeout
    pub workers_exited: bool,
    /// The queue emptied before the drain deadline
    pub drained: bool,
    pub final_flush: FinalFlush,
    /// Records left in the queue after the final flush
    pub residue: usize,
    pub elapsed: Duration,
}

/// Resources that exist only while the pipeline runs
struct Active<S, M> {
    wal: Mutex<DurableLog>,
    queue: Arc<BoundedQueue<Record>>,
    processor: BatchProcessor<S, M>,
}

/// Owns the WAL, queue and batch threads, and orders their startup and
/// shutdown
pub struct Coordinator<S, M> {
    config: PipelineConfig,
    sink: Arc<S>,
    metrics: Arc<M>,
    state: Mutex<State>,
    active: RwLock<Option<Arc<Active<S, M>>>>,
    pool: Mutex<Option<WorkerPool>>,
}

impl<S: PersistenceSink, M: MetricsSink> Coordinator<S, M> {
    pub fn new(config: PipelineConfig, sink: S, metrics: M) -> Self {
        Self {
            config,
            sink: Arc::new(sink),
            metrics: Arc::new(metrics),
            state: Mutex::new(State::Stopped),
            active: RwLock::new(None),
            pool: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> State {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: State) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn active(&self) -> Option<Arc<Active<S, M>>> {
        self.active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Open the WAL, create the queue and start the batch threads.
    ///
    /// On failure everything opened so far is released and the pipeline
    /// stays stopped.
    pub fn start(&self) -> Result<(), LifecycleError> {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state != State::Stopped {
                return Err(LifecycleError::AlreadyStarted(*state));
            }
            *state = State::Starting;
        }

        match self.init() {
            Ok((active, pool)) => {
                *self.active.write().unwrap_or_else(|e| e.into_inner()) = Some(active);
                *self.pool.lock().unwrap_or_else(|e| e.into_inner()) = Some(pool);
                self.set_state(State::Running);
                info!(
                    wal = %self.config.wal_path.display(),
                    queue_capacity = self.config.queue_capacity,
                    "pipeline started"
                );
                Ok(())
            }
            Err(e) => {
                self.set_state(State::Stopped);
                error!(error = %e, "pipeline failed to start");
                Err(e)
            }
        }
    }

    fn init(&self) -> Result<(Arc<Active<S, M>>, WorkerPool), LifecycleError> {
        self.config.validate()?;

        let wal = DurableLog::open(&self.config.wal_path, self.config.backup)
            .map_err(LifecycleError::Init)?;
        let queue = Arc::new(BoundedQueue::new(self.config.queue_capacity));
        let processor = BatchProcessor::new(
            Arc::clone(&queue),
            Arc::clone(&self.sink),
            Arc::clone(&self.metrics),
            self.config.batch_size,
        );
        let pool = processor.spawn(
            self.config.worker_threads,
            self.config.worker_poll_interval,
            self.config.flush_interval,
        )?;

        let active = Arc::new(Active {
            wal: Mutex::new(wal),
            queue,
            processor,
        });
        Ok((active, pool))
    }

    /// Write a record to the WAL, then hand it to the batch queue.
    ///
    /// WAL failures are returned; a refused offer is only counted.
    pub fn log_change(&self, record: Record) -> Result<Logged, LifecycleError> {
        if !self.config.capture.should_capture(record.entity().name()) {
            return Ok(Logged::Skipped);
        }
        let active = self.active().ok_or(LifecycleError::NotRunning)?;

        active
            .wal
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .write(&record)
            .map_err(|e| match e {
                // stop() closed the log after this call picked up the handle
                WalError::Closed => LifecycleError::NotRunning,
                e => LifecycleError::Write(e),
            })?;

        let id = record.id();
        let start = Instant::now();
        let accepted = active.queue.offer(record);
        self.metrics.record_offer_latency(start.elapsed());

        if accepted {
            Ok(Logged::Queued)
        } else {
            self.metrics.increment_dropped(1);
            debug!(%id, "queue refused record");
            Ok(Logged::Dropped)
        }
    }

    /// Records waiting for a batch; zero when not running
    pub fn queue_size(&self) -> usize {
        self.active().map_or(0, |a| a.queue.size())
    }

    /// Durable WAL position; `None` when not running
    pub fn checkpoint(&self) -> Option<Checkpoint> {
        self.active()
            .map(|a| a.wal.lock().unwrap_or_else(|e| e.into_inner()).checkpoint())
    }

    /// Stop intake, drain what can be drained and release resources.
    ///
    /// Every step runs even if an earlier one gives up; records that never
    /// reached the sink are logged and counted as dropped.
    pub fn stop(&self) -> ShutdownReport {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state != State::Running {
                let current = *state;
                debug!(state = %current, "stop ignored");
                return ShutdownReport::default();
            }
            *state = State::Stopping;
        }

        let start = Instant::now();
        let shutdown = &self.config.shutdown;
        let mut report = ShutdownReport::default();
        info!(queued = self.queue_size(), "pipeline stopping");

        let pool = self.pool.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(active) = self.active() {
            // 1. refuse new records
            active.queue.close();

            // 2. stop batch threads
            report.workers_exited = match pool {
                Some(pool) => pool.shutdown(shutdown.worker_timeout),
                None => true,
            };

            // 3. wait for the queue to empty
            report.drained = wait_for_drain(
                &active.queue,
                shutdown.drain_timeout,
                shutdown.poll_interval,
            );
            if !report.drained {
                warn!(
                    remaining = active.queue.size(),
                    "queue not drained before deadline"
                );
            }

            // 4. final flush
            report.final_flush = active.processor.final_flush(shutdown.final_flush_rounds);
            self.metrics
                .increment_shutdown_flushed(report.final_flush.persisted as u64);

            let residue = active.queue.drain_all();
            report.residue = residue.len();
            self.log_residue(&residue);

            // 5. close the WAL; later callers see NotRunning
            *self.active.write().unwrap_or_else(|e| e.into_inner()) = None;
            active.wal.lock().unwrap_or_else(|e| e.into_inner()).close();
        }

        // 6. close metrics
        self.metrics.gauge_queue_size(0);
        self.metrics.shutdown();

        self.set_state(State::Stopped);

        report.elapsed = start.elapsed();
        info!(
            workers_exited = report.workers_exited,
            drained = report.drained,
            final_flush_rounds = report.final_flush.rounds,
            flushed = report.final_flush.persisted,
            residue = report.residue,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "pipeline stopped"
        );
        report
    }

    fn log_residue(&self, residue: &[Record]) {
        if residue.is_empty() {
            return;
        }
        let limit = self.config.shutdown.residue_log_limit;
        for record in residue.iter().take(limit) {
            warn!(
                id = %record.id(),
                entity = %record.entity(),
                operation = %record.operation(),
                "record not delivered to sink"
            );
        }
        if residue.len() > limit {
            warn!(
                unlisted = residue.len() - limit,
                "more records not delivered to sink"
            );
        }
        error!(
            lost = residue.len(),
            "records left in queue at shutdown; they remain in the WAL only"
        );
        self.metrics.increment_dropped(residue.len() as u64);
    }
}

impl<S, M> Drop for Coordinator<S, M> {
    fn drop(&mut self) {
        let state = *self.state.get_mut().unwrap_or_else(|e| e.into_inner());
        if state != State::Stopped {
            warn!(%state, "pipeline dropped without stop");
        }
        if let Some(pool) = self.pool.get_mut().unwrap_or_else(|e| e.into_inner()).take() {
            pool.shutdown(self.config.shutdown.worker_timeout);
        }
    }
}

/// Poll until `queue` is empty or `timeout` passes; true if it emptied
fn wait_for_drain(queue: &BoundedQueue<Record>, timeout: Duration, poll: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if queue.is_empty() {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        thread::sleep(poll.min(deadline - now));
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
