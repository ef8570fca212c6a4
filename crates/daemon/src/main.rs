// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entity change log daemon (ecld)
//!
//! Reads change requests from stdin, writes each to the WAL and persists them
//! in batches to a JSON-lines file. Stops on EOF, SIGINT or SIGTERM.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ecl_adapters::{AtomicMetrics, JsonlSink, TracedSink};
use ecl_daemon::{ingest_line, Args, IngestStats};
use ecl_engine::Coordinator;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ecld: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let settings = args.resolve()?;

    // Write startup marker to log (before tracing setup, so it lands first)
    write_startup_marker(&settings.log)?;

    let log_guard = setup_logging(&settings.log)?;

    info!(
        wal = %settings.pipeline.wal_path.display(),
        output = %settings.output.display(),
        "starting ecld"
    );

    let sink = match JsonlSink::open(&settings.output) {
        Ok(sink) => TracedSink::new(sink),
        Err(e) => {
            write_startup_error(&settings.log, &e);
            error!(error = %e, "failed to open output");
            drop(log_guard);
            return Err(e.into());
        }
    };
    let metrics = Arc::new(AtomicMetrics::new());
    let coordinator = Arc::new(Coordinator::new(
        settings.pipeline.clone(),
        sink,
        Arc::clone(&metrics),
    ));

    if let Err(e) = coordinator.start() {
        // Write error synchronously (tracing is non-blocking and may not flush in time)
        write_startup_error(&settings.log, &e);
        error!(error = %e, "failed to start pipeline");
        drop(log_guard);
        return Err(e.into());
    }

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("ecld ready, reading stdin");
    println!("READY");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stats = IngestStats::default();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    // WAL writes sync to disk; keep them off the reactor
                    tokio::task::block_in_place(|| ingest_line(&*coordinator, &line, &mut stats));
                }
                Ok(None) => {
                    info!("stdin closed, shutting down...");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "failed to read stdin, shutting down...");
                    break;
                }
            },

            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }

            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                break;
            }
        }
    }

    let report = {
        let coordinator = Arc::clone(&coordinator);
        tokio::task::spawn_blocking(move || coordinator.stop()).await?
    };

    let snapshot = metrics.snapshot();
    for (name, value) in snapshot.counters() {
        info!(metric = name, value, "final metric");
    }
    info!(
        batches = snapshot.batch_size.count,
        mean_batch_size = snapshot.batch_size.mean(),
        max_batch_size = snapshot.batch_size.max,
        mean_batch_latency_us = snapshot.batch_latency.mean_us(),
        "batch statistics"
    );

    println!(
        "ingested {} lines: {} queued, {} dropped, {} skipped, {} rejected, {} failed; \
         persisted {}, save errors {}, residue {}",
        stats.lines,
        stats.queued,
        stats.dropped,
        stats.skipped,
        stats.rejected,
        stats.failed,
        snapshot.processed,
        snapshot.save_errors,
        report.residue,
    );

    info!("ecld stopped");
    drop(log_guard);
    Ok(())
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- ecld: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- ecld: starting (pid: ";

/// Append the startup marker to the log file
fn write_startup_marker(log_path: &Path) -> std::io::Result<()> {
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to the log file
fn write_startup_error(log_path: &Path, error: &dyn std::fmt::Display) {
    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR failed to start ecld: {}", error);
}

fn setup_logging(
    log_path: &Path,
) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = match log_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let file_name = log_path.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("log path {} has no file name", log_path.display()),
        )
    })?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}
