// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Last-known-good copy of the WAL used for corruption recovery

use crate::wal::WalError;
use ecl_core::BackupPolicy;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub(crate) struct Backup {
    path: PathBuf,
    policy: BackupPolicy,
    /// Append handle, only for [`BackupPolicy::Mirror`]
    mirror: Option<File>,
}

impl Backup {
    pub(crate) fn new(path: PathBuf, policy: BackupPolicy) -> Self {
        Self {
            path,
            policy,
            mirror: None,
        }
    }

    pub(crate) fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Bring the backup in line with the first `position` bytes of `live`.
    ///
    /// A longer backup is trimmed; a shorter or missing one is reseeded with a
    /// full copy of the live file.
    pub(crate) fn reconcile(&mut self, live: &Path, position: u64) -> Result<(), WalError> {
        self.mirror = None;
        let size = file_len(&self.path)?;
        if size != Some(position) {
            match size {
                Some(size) if size > position => {
                    debug!(backup = %self.path.display(), size, position, "trimming backup");
                    OpenOptions::new()
                        .write(true)
                        .open(&self.path)?
                        .set_len(position)?;
                }
                _ => {
                    debug!(backup = %self.path.display(), position, "reseeding backup");
                    fs::copy(live, &self.path)?;
                }
            }
        }
        if self.policy == BackupPolicy::Mirror {
            self.mirror = Some(OpenOptions::new().append(true).open(&self.path)?);
        }
        Ok(())
    }

    /// Refresh the backup after `line` was appended to `live`
    pub(crate) fn record(&mut self, live: &Path, line: &[u8]) -> Result<(), WalError> {
        match self.policy {
            BackupPolicy::Mirror => {
                let file = self.mirror.as_mut().ok_or(WalError::Closed)?;
                file.write_all(line)?;
                file.sync_data()?;
            }
            BackupPolicy::FullCopy => {
                fs::copy(live, &self.path)?;
            }
        }
        Ok(())
    }

    /// Undo a partial refresh so the backup ends at `position` again
    pub(crate) fn rollback(&mut self, position: u64) {
        let result = match self.policy {
            BackupPolicy::Mirror => match &self.mirror {
                Some(file) => file.set_len(position),
                None => Ok(()),
            },
            // The previous full copy is either intact or replaced by a longer one
            BackupPolicy::FullCopy => match fs::metadata(&self.path) {
                Ok(meta) if meta.len() > position => OpenOptions::new()
                    .write(true)
                    .open(&self.path)
                    .and_then(|f| f.set_len(position)),
                _ => Ok(()),
            },
        };
        if let Err(e) = result {
            warn!(backup = %self.path.display(), error = %e, "failed to roll back backup");
        }
    }

    /// Copy the backup over `live`
    pub(crate) fn restore_into(&self, live: &Path) -> Result<u64, WalError> {
        if !self.exists() {
            return Err(WalError::NoBackup(self.path.clone()));
        }
        Ok(fs::copy(&self.path, live)?)
    }

    pub(crate) fn close(&mut self) {
        if let Some(file) = self.mirror.take() {
            if let Err(e) = file.sync_all() {
                warn!(backup = %self.path.display(), error = %e, "failed to sync backup on close");
            }
        }
    }
}

/// Size of the file at `path`, `None` if it doesn't exist
pub(crate) fn file_len(path: &Path) -> Result<Option<u64>, WalError> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
