// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ecl_adapters::{AtomicMetrics, FakeBehavior, FakeSink, NoOpMetrics};
use ecl_core::{ChangeSet, EntityRef, Operation};
use ecl_storage::WalError;
use std::path::Path;
use tempfile::TempDir;

const HOUR: Duration = Duration::from_secs(3600);

fn record(entity: &str, id: usize) -> Record {
    Record::new(
        EntityRef::new(entity, id.to_string()).unwrap(),
        Operation::Create,
        ChangeSet::empty(),
    )
}

/// Config with timers long enough that nothing drains unless a test asks
fn config(dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig {
        queue_capacity: 1000,
        worker_threads: 1,
        batch_size: 100,
        flush_interval: HOUR,
        worker_poll_interval: Duration::from_millis(10),
        wal_path: dir.join("wal/changes.log"),
        ..PipelineConfig::default()
    };
    config.shutdown.worker_timeout = Duration::from_secs(5);
    config.shutdown.drain_timeout = Duration::from_secs(2);
    config.shutdown.poll_interval = Duration::from_millis(10);
    config
}

struct Harness {
    _dir: TempDir,
    sink: FakeSink,
    metrics: Arc<AtomicMetrics>,
    coordinator: Coordinator<FakeSink, Arc<AtomicMetrics>>,
}

fn harness(tweak: impl FnOnce(&mut PipelineConfig)) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    tweak(&mut config);
    let sink = FakeSink::new();
    let metrics = Arc::new(AtomicMetrics::new());
    let coordinator = Coordinator::new(config, sink.clone(), Arc::clone(&metrics));
    Harness {
        _dir: dir,
        sink,
        metrics,
        coordinator,
    }
}

#[test]
fn starts_stopped() {
    let h = harness(|_| {});
    assert_eq!(h.coordinator.state(), State::Stopped);
    assert_eq!(h.coordinator.queue_size(), 0);
    assert!(h.coordinator.checkpoint().is_none());
}

#[test]
fn start_then_stop() {
    let h = harness(|_| {});

    h.coordinator.start().unwrap();
    assert_eq!(h.coordinator.state(), State::Running);

    let report = h.coordinator.stop();
    assert_eq!(h.coordinator.state(), State::Stopped);
    assert!(report.workers_exited);
    assert!(report.drained);
    assert_eq!(report.residue, 0);
    assert!(h.metrics.is_shut_down());
}

#[test]
fn log_change_before_start_is_refused() {
    let h = harness(|_| {});

    let err = h.coordinator.log_change(record("User", 1)).unwrap_err();

    assert!(matches!(err, LifecycleError::NotRunning));
}

#[test]
fn double_start_is_refused() {
    let h = harness(|_| {});
    h.coordinator.start().unwrap();

    let err = h.coordinator.start().unwrap_err();

    assert!(matches!(err, LifecycleError::AlreadyStarted(State::Running)));
    h.coordinator.stop();
}

#[test]
fn stop_when_stopped_is_a_no_op() {
    let h = harness(|_| {});
    assert_eq!(h.coordinator.stop(), ShutdownReport::default());
}

#[test]
fn logged_records_are_durable_before_delivery() {
    let h = harness(|_| {});
    h.coordinator.start().unwrap();

    let r = record("User", 1);
    assert_eq!(h.coordinator.log_change(r.clone()).unwrap(), Logged::Queued);

    let expected = serde_json::to_vec(&r).unwrap().len() as u64 + 1;
    assert_eq!(h.coordinator.checkpoint().unwrap().position, expected);
    assert_eq!(h.coordinator.queue_size(), 1);
    h.coordinator.stop();

    let replayed = DurableLog::replay(&h.coordinator.config().wal_path).unwrap();
    assert_eq!(replayed, vec![r]);
}

#[test]
fn full_queue_drops_and_counts() {
    let h = harness(|c| {
        c.queue_capacity = 1;
        c.batch_size = 10;
    });
    h.coordinator.start().unwrap();

    let a = record("User", 1);
    let b = record("User", 2);
    assert_eq!(h.coordinator.log_change(a.clone()).unwrap(), Logged::Queued);
    assert_eq!(h.coordinator.log_change(b.clone()).unwrap(), Logged::Dropped);

    assert_eq!(h.metrics.snapshot().dropped, 1);
    assert_eq!(h.coordinator.queue_size(), 1);

    h.coordinator.stop();
    // Only A reaches the sink, but both are in the WAL
    assert_eq!(h.sink.records(), vec![a.clone()]);
    let replayed = DurableLog::replay(&h.coordinator.config().wal_path).unwrap();
    assert_eq!(replayed, vec![a, b]);
}

#[test]
fn shutdown_delivers_every_queued_record() {
    let h = harness(|_| {});
    h.coordinator.start().unwrap();

    let records: Vec<_> = (0..50).map(|i| record("Order", i)).collect();
    for r in &records {
        h.coordinator.log_change(r.clone()).unwrap();
    }

    let report = h.coordinator.stop();

    assert_eq!(h.sink.records(), records);
    assert_eq!(report.residue, 0);
    assert_eq!(h.metrics.snapshot().processed, 50);
    assert_eq!(h.metrics.snapshot().dropped, 0);
}

#[test]
fn shutdown_terminates_with_failing_sink() {
    let h = harness(|_| {});
    h.sink.set_behavior(FakeBehavior::Fail);
    h.coordinator.start().unwrap();

    for i in 0..20 {
        h.coordinator.log_change(record("Order", i)).unwrap();
    }
    let report = h.coordinator.stop();

    assert_eq!(h.coordinator.state(), State::Stopped);
    assert!(report.drained);
    assert!(h.sink.records().is_empty());
    assert!(h.metrics.snapshot().save_errors >= 1);
    assert_eq!(h.metrics.snapshot().processed, 0);
}

#[test]
fn abandoned_workers_leave_residue_to_final_flush() {
    let h = harness(|c| {
        c.batch_size = 1;
        c.shutdown.worker_timeout = Duration::from_millis(20);
        c.shutdown.drain_timeout = Duration::from_millis(20);
        c.shutdown.final_flush_rounds = 1;
        c.shutdown.residue_log_limit = 1;
    });
    h.sink.set_delay(Duration::from_millis(300));
    h.coordinator.start().unwrap();

    for i in 0..10 {
        h.coordinator.log_change(record("Order", i)).unwrap();
    }
    let report = h.coordinator.stop();

    assert!(!report.workers_exited);
    assert!(!report.drained);
    assert_eq!(report.final_flush.rounds, 1);
    assert!(report.residue > 0);
    assert!(h.metrics.snapshot().dropped >= report.residue as u64);
}

#[test]
fn excluded_entities_are_skipped() {
    let h = harness(|c| {
        c.capture.excluded_entities.insert("AuditLog".to_string());
    });
    h.coordinator.start().unwrap();

    assert_eq!(
        h.coordinator.log_change(record("AuditLog", 1)).unwrap(),
        Logged::Skipped
    );
    assert_eq!(h.coordinator.checkpoint().unwrap().position, 0);
    h.coordinator.stop();
}

#[test]
fn disabled_capture_skips_everything() {
    let h = harness(|c| c.capture.enabled = false);

    // Skipping happens before the running check
    assert_eq!(
        h.coordinator.log_change(record("User", 1)).unwrap(),
        Logged::Skipped
    );
}

#[test]
fn log_change_after_stop_is_refused() {
    let h = harness(|_| {});
    h.coordinator.start().unwrap();
    h.coordinator.stop();

    let err = h.coordinator.log_change(record("User", 1)).unwrap_err();
    assert!(matches!(err, LifecycleError::NotRunning));
}

#[test]
fn producers_racing_stop_never_see_closed_wal() {
    let h = harness(|c| c.flush_interval = Duration::from_millis(5));
    h.sink.set_delay(Duration::from_millis(2));
    h.coordinator.start().unwrap();

    thread::scope(|s| {
        for p in 0..3 {
            let coordinator = &h.coordinator;
            s.spawn(move || {
                let mut i = 0;
                loop {
                    match coordinator.log_change(record("User", p * 100_000 + i)) {
                        Ok(Logged::Queued | Logged::Dropped) => {}
                        Err(LifecycleError::NotRunning) => break,
                        other => panic!("unexpected result during stop: {:?}", other),
                    }
                    i += 1;
                }
            });
        }
        thread::sleep(Duration::from_millis(20));
        h.coordinator.stop();
    });

    assert_eq!(h.coordinator.state(), State::Stopped);
}

#[test]
fn restart_after_stop_reopens_wal() {
    let h = harness(|_| {});
    h.coordinator.start().unwrap();
    h.coordinator.log_change(record("User", 1)).unwrap();
    let first = h.coordinator.checkpoint().unwrap();
    h.coordinator.stop();

    h.coordinator.start().unwrap();
    assert_eq!(h.coordinator.checkpoint().unwrap(), first);
    h.coordinator.log_change(record("User", 2)).unwrap();
    h.coordinator.stop();

    assert_eq!(h.sink.records().len(), 2);
}

#[test]
fn second_coordinator_on_same_wal_fails_to_start() {
    let h = harness(|_| {});
    h.coordinator.start().unwrap();

    let other = Coordinator::new(h.coordinator.config().clone(), FakeSink::new(), NoOpMetrics);
    let err = other.start().unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::Init(WalError::LockHeldInProcess(_))
    ));
    assert_eq!(other.state(), State::Stopped);
    h.coordinator.stop();
}

#[test]
fn invalid_config_fails_to_start() {
    let h = harness(|c| c.batch_size = 0);

    let err = h.coordinator.start().unwrap_err();

    assert!(matches!(err, LifecycleError::Config(_)));
    assert_eq!(h.coordinator.state(), State::Stopped);
    assert!(err.to_string().starts_with("initialization failed"));
}

#[test]
fn concurrent_producers_all_reach_the_sink() {
    let h = harness(|c| {
        c.worker_threads = 3;
        c.batch_size = 7;
        c.flush_interval = Duration::from_millis(20);
    });
    h.coordinator.start().unwrap();

    thread::scope(|s| {
        for p in 0..4 {
            let coordinator = &h.coordinator;
            s.spawn(move || {
                for i in 0..25 {
                    let logged = coordinator.log_change(record("Item", p * 100 + i)).unwrap();
                    assert_eq!(logged, Logged::Queued);
                }
            });
        }
    });
    h.coordinator.stop();

    let mut ids: Vec<_> = h
        .sink
        .records()
        .iter()
        .map(|r| r.entity().id().to_string())
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 100);
    assert_eq!(h.metrics.snapshot().processed, 100);
}
