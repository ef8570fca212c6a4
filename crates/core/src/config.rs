// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline configuration
//!
//! Built once at startup (from TOML, CLI flags, or code) and handed to every
//! component by reference. Durations use humantime syntax (`"250ms"`, `"5s"`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// How the WAL backup file is kept in step with the live log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupPolicy {
    /// Append every record to the backup as well (cost per write is the record size)
    #[default]
    Mirror,
    /// Copy the whole live file after every write (cost per write is the file size)
    FullCopy,
}

/// Bounds for the shutdown drain protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShutdownConfig {
    /// How long to wait for worker threads to exit
    #[serde(with = "humantime_serde")]
    pub worker_timeout: Duration,
    /// How long to wait for the queue to empty
    #[serde(with = "humantime_serde")]
    pub drain_timeout: Duration,
    /// Sleep between queue occupancy checks while draining
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Maximum flush rounds after the drain wait
    pub final_flush_rounds: usize,
    /// Dropped records logged individually before summarizing
    pub residue_log_limit: usize,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            worker_timeout: Duration::from_secs(10),
            drain_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
            final_flush_rounds: 5,
            residue_log_limit: 10,
        }
    }
}

/// Which entities are captured at all
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    pub enabled: bool,
    /// Entity type names never logged
    pub excluded_entities: BTreeSet<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            excluded_entities: BTreeSet::new(),
        }
    }
}

impl CaptureConfig {
    pub fn should_capture(&self, entity_name: &str) -> bool {
        self.enabled && !self.excluded_entities.contains(entity_name)
    }
}

/// Configuration for the whole pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Maximum records held in the ingestion queue
    pub queue_capacity: usize,
    /// Size of the batch worker pool
    pub worker_threads: usize,
    /// Records per persisted batch
    pub batch_size: usize,
    /// Period of the time-triggered flush
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,
    /// Sleep between occupancy checks in a waiting worker
    #[serde(with = "humantime_serde")]
    pub worker_poll_interval: Duration,
    /// Live WAL file; checkpoint, backup and lock files live next to it
    pub wal_path: PathBuf,
    pub backup: BackupPolicy,
    pub shutdown: ShutdownConfig,
    pub capture: CaptureConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 100_000,
            worker_threads: 5,
            batch_size: 500,
            flush_interval: Duration::from_secs(5),
            worker_poll_interval: Duration::from_millis(50),
            wal_path: PathBuf::from("logs/entity-changes.log"),
            backup: BackupPolicy::default(),
            shutdown: ShutdownConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be positive"));
        }
        if self.worker_threads == 0 {
            return Err(ConfigError::Invalid("worker_threads must be positive"));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be positive"));
        }
        if self.flush_interval.is_zero() {
            return Err(ConfigError::Invalid("flush_interval must be positive"));
        }
        if self.worker_poll_interval.is_zero() {
            return Err(ConfigError::Invalid("worker_poll_interval must be positive"));
        }
        if self.shutdown.poll_interval.is_zero() {
            return Err(ConfigError::Invalid("shutdown.poll_interval must be positive"));
        }
        if self.shutdown.final_flush_rounds == 0 {
            return Err(ConfigError::Invalid(
                "shutdown.final_flush_rounds must be positive",
            ));
        }
        if self.wal_path.file_name().is_none() {
            return Err(ConfigError::Invalid("wal_path must name a file"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
