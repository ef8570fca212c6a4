// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log for durable storage of change records
//!
//! On disk a log named `changes.log` is accompanied by:
//! - `changes.log.checkpoint`: JSON `{position, timestamp}` of the durable end
//! - `changes.log.backup`: last-known-good copy used for recovery
//! - `changes.log.lock`: exclusive lock file holding the owner's PID
//!
//! Every write appends one JSON line, syncs it, refreshes the backup, then
//! replaces the checkpoint. A write either advances the checkpoint or leaves
//! the log rolled back to it.

use crate::backup::{file_len, Backup};
use crate::checkpoint;
use crate::lock::LogLock;
use chrono::{DateTime, Utc};
use ecl_core::{BackupPolicy, Checkpoint, Record};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("WAL lock {0} is already held by this process")]
    LockHeldInProcess(PathBuf),
    #[error("WAL lock {path} is held by another process")]
    LockHeldExternally {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("WAL {path} is corrupted: {file_size} bytes on disk, checkpoint at {checkpoint}")]
    Corrupted {
        path: PathBuf,
        file_size: u64,
        checkpoint: u64,
    },
    #[error("no backup at {0} to recover from")]
    NoBackup(PathBuf),
    #[error("unreadable checkpoint {path}: {source}")]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("WAL is closed")]
    Closed,
}

/// Files that make up one WAL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPaths {
    pub live: PathBuf,
    pub checkpoint: PathBuf,
    pub backup: PathBuf,
    pub lock: PathBuf,
}

impl LogPaths {
    pub fn for_log(live: &Path) -> Self {
        Self {
            live: live.to_path_buf(),
            checkpoint: sibling(live, "checkpoint"),
            backup: sibling(live, "backup"),
            lock: sibling(live, "lock"),
        }
    }

    /// Where a corrupted live file is moved at `now`
    pub fn corrupted(&self, now: DateTime<Utc>) -> PathBuf {
        let name = self.live.file_name().unwrap_or_default().to_string_lossy();
        self.live.with_file_name(format!(
            "corrupted-{}-{}",
            now.format("%Y%m%d%H%M%S%3f"),
            name
        ))
    }
}

fn sibling(live: &Path, suffix: &str) -> PathBuf {
    let mut name = live.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    live.with_file_name(name)
}

/// Append-only record log with checkpointing and backup-based recovery
pub struct DurableLog {
    paths: LogPaths,
    file: Option<File>,
    backup: Backup,
    checkpoint: Checkpoint,
    recoveries: u64,
    // NOTE(lifetime): Held to maintain exclusive ownership; None once closed
    lock: Option<LogLock>,
}

impl DurableLog {
    /// Take ownership of the WAL at `path`, creating it if needed.
    ///
    /// Fails with [`WalError::LockHeldInProcess`] or
    /// [`WalError::LockHeldExternally`] when someone else owns it, and with
    /// [`WalError::NoBackup`] when the log is shorter than its checkpoint and
    /// can't be restored.
    pub fn open(path: &Path, policy: BackupPolicy) -> Result<Self, WalError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let paths = LogPaths::for_log(path);
        let lock = LogLock::acquire(&paths.lock)?;
        let mut log = Self {
            backup: Backup::new(paths.backup.clone(), policy),
            paths,
            file: None,
            checkpoint: Checkpoint::origin(),
            recoveries: 0,
            lock: Some(lock),
        };
        log.init()?;

        info!(
            path = %log.paths.live.display(),
            position = log.checkpoint.position,
            ?policy,
            "WAL opened"
        );
        Ok(log)
    }

    /// Load the checkpoint, repair the live file against it and open handles
    fn init(&mut self) -> Result<(), WalError> {
        let stored = checkpoint::load(&self.paths.checkpoint)?;
        let mut size = file_len(&self.paths.live)?.unwrap_or(0);

        let checkpoint = match stored {
            Some(checkpoint) => {
                if checkpoint.exceeds(size) {
                    warn!(
                        path = %self.paths.live.display(),
                        file_size = size,
                        checkpoint = checkpoint.position,
                        "WAL shorter than its checkpoint"
                    );
                    size = self.restore()?;
                    if checkpoint.exceeds(size) {
                        return Err(WalError::Corrupted {
                            path: self.paths.live.clone(),
                            file_size: size,
                            checkpoint: checkpoint.position,
                        });
                    }
                }
                checkpoint
            }
            // First open: whatever is on disk counts as durable
            None => {
                let checkpoint = Checkpoint::at(size);
                checkpoint::store(&self.paths.checkpoint, &checkpoint)?;
                checkpoint
            }
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.paths.live)?;
        if size > checkpoint.position {
            warn!(
                path = %self.paths.live.display(),
                discarded = size - checkpoint.position,
                "discarding unacknowledged bytes past checkpoint"
            );
            file.set_len(checkpoint.position)?;
            file.sync_all()?;
        }

        self.backup.reconcile(&self.paths.live, checkpoint.position)?;
        self.file = Some(file);
        self.checkpoint = checkpoint;
        Ok(())
    }

    /// Move the live file aside and copy the backup into place.
    ///
    /// Returns the size of the restored file.
    fn restore(&mut self) -> Result<u64, WalError> {
        if !self.backup.exists() {
            error!(
                path = %self.paths.live.display(),
                backup = %self.paths.backup.display(),
                "no backup available for recovery"
            );
            return Err(WalError::NoBackup(self.paths.backup.clone()));
        }

        if self.paths.live.exists() {
            let aside = self.paths.corrupted(Utc::now());
            fs::rename(&self.paths.live, &aside)?;
            warn!(aside = %aside.display(), "moved corrupted WAL aside");
        }

        let restored = self.backup.restore_into(&self.paths.live)?;
        self.recoveries += 1;
        info!(
            path = %self.paths.live.display(),
            restored_bytes = restored,
            "WAL restored from backup"
        );
        Ok(restored)
    }

    /// Append a record and advance the checkpoint past it
    pub fn write(&mut self, record: &Record) -> Result<Checkpoint, WalError> {
        if self.file.is_none() {
            return Err(WalError::Closed);
        }

        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        // Truncation behind our back: the file is shorter than what we acknowledged
        if self.is_corrupted() {
            self.recover()?;
        }

        match self.append(&line) {
            Ok(checkpoint) => Ok(checkpoint),
            Err(e) => {
                if self.is_corrupted() {
                    if let Err(recovery) = self.recover() {
                        error!(error = %recovery, "WAL recovery failed");
                    }
                } else {
                    self.rollback();
                }
                Err(e)
            }
        }
    }

    fn append(&mut self, line: &[u8]) -> Result<Checkpoint, WalError> {
        let file = self.file.as_mut().ok_or(WalError::Closed)?;
        file.write_all(line)?;
        file.sync_data()?;

        // Backup before checkpoint, so the backup always covers the checkpoint
        self.backup.record(&self.paths.live, line)?;

        let next = self.checkpoint.advanced_by(line.len() as u64);
        checkpoint::store(&self.paths.checkpoint, &next)?;
        self.checkpoint = next;
        Ok(next)
    }

    /// Cut a failed partial append back to the checkpoint
    fn rollback(&mut self) {
        let position = self.checkpoint.position;
        if let Some(file) = &self.file {
            if let Err(e) = file.set_len(position) {
                warn!(error = %e, position, "failed to roll back WAL after write error");
            }
        }
        self.backup.rollback(position);
    }

    fn recover(&mut self) -> Result<(), WalError> {
        warn!(
            path = %self.paths.live.display(),
            checkpoint = self.checkpoint.position,
            "WAL corruption detected, recovering"
        );
        self.file = None;
        self.backup.close();
        self.init()
    }

    /// Whether the live file is missing or shorter than the checkpoint
    pub fn is_corrupted(&self) -> bool {
        match fs::metadata(&self.paths.live) {
            Ok(meta) => self.checkpoint.exceeds(meta.len()),
            Err(_) => true,
        }
    }

    /// Release the lock and close handles. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = file.sync_all() {
                warn!(error = %e, "failed to sync WAL on close");
            }
        }
        self.backup.close();
        if self.lock.take().is_some() {
            info!(
                path = %self.paths.live.display(),
                position = self.checkpoint.position,
                "WAL closed"
            );
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock.is_none()
    }

    /// Current durable offset
    pub fn checkpoint(&self) -> Checkpoint {
        self.checkpoint
    }

    pub fn paths(&self) -> &LogPaths {
        &self.paths
    }

    /// Number of times the log was restored from backup since opening
    pub fn recoveries(&self) -> u64 {
        self.recoveries
    }

    /// Read back every record up to the stored checkpoint
    pub fn replay(path: &Path) -> Result<Vec<Record>, WalError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let limit = checkpoint::load(&LogPaths::for_log(path).checkpoint)?
            .map_or(u64::MAX, |c| c.position);

        let reader = BufReader::new(file.take(limit));
        let mut records = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }

        Ok(records)
    }
}

impl Drop for DurableLog {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
