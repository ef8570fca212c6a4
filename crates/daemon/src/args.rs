// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line arguments and the settings resolved from them

use clap::Parser;
use ecl_core::{ConfigError, PipelineConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Entity change log daemon
#[derive(Debug, Parser)]
#[command(
    name = "ecld",
    version,
    about = "Reads entity changes from stdin, logs them durably and persists them in batches"
)]
pub struct Args {
    /// Pipeline config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write-ahead log path
    #[arg(long)]
    pub wal: Option<PathBuf>,

    /// File receiving persisted batches as JSON lines
    #[arg(long, default_value = "logs/entity-changes.jsonl")]
    pub output: PathBuf,

    /// Daemon log file
    #[arg(long, default_value = "logs/ecld.log")]
    pub log: PathBuf,

    /// Records per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Batch worker threads
    #[arg(long)]
    pub workers: Option<usize>,

    /// Ingestion queue capacity
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Timed flush interval (e.g. `5s`, `250ms`)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub flush_interval: Option<Duration>,
}

/// Everything the daemon needs after argument parsing
#[derive(Debug, Clone)]
pub struct Settings {
    pub pipeline: PipelineConfig,
    pub output: PathBuf,
    pub log: PathBuf,
}

impl Args {
    /// Load the config file if given, apply flag overrides and validate
    pub fn resolve(self) -> Result<Settings, ConfigError> {
        let mut pipeline = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(wal) = self.wal {
            pipeline.wal_path = wal;
        }
        if let Some(n) = self.batch_size {
            pipeline.batch_size = n;
        }
        if let Some(n) = self.workers {
            pipeline.worker_threads = n;
        }
        if let Some(n) = self.queue_capacity {
            pipeline.queue_capacity = n;
        }
        if let Some(d) = self.flush_interval {
            pipeline.flush_interval = d;
        }

        pipeline.validate()?;
        Ok(Settings {
            pipeline,
            output: self.output,
            log: self.log,
        })
    }
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
