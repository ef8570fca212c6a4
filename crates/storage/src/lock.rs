// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exclusive ownership of a WAL via a sibling lock file

use crate::wal::WalError;
use fs2::FileExt;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tracing::warn;

/// Lock files held by this process.
///
/// An OS file lock can't tell a second opener in the same process from one in
/// another process, so in-process holders are tracked here first.
fn held() -> &'static Mutex<HashSet<PathBuf>> {
    static HELD: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    HELD.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Held exclusive lock; released on drop
pub(crate) struct LogLock {
    key: PathBuf,
    // NOTE(lifetime): Held to maintain the OS lock; unlocked on drop
    file: File,
}

impl LogLock {
    pub(crate) fn acquire(path: &Path) -> Result<Self, WalError> {
        // Don't truncate before locking: the current holder's PID lives here
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;
        let key = path.canonicalize()?;

        {
            let mut held = held().lock().unwrap_or_else(|e| e.into_inner());
            if !held.insert(key.clone()) {
                return Err(WalError::LockHeldInProcess(path.to_path_buf()));
            }
        }

        if let Err(source) = file.try_lock_exclusive() {
            forget(&key);
            return Err(WalError::LockHeldExternally {
                path: path.to_path_buf(),
                source,
            });
        }

        // Record the owner for operators; the lock is what matters
        if let Err(e) = file
            .set_len(0)
            .and_then(|()| writeln!(file, "{}", std::process::id()))
        {
            warn!(path = %path.display(), error = %e, "failed to write PID to lock file");
        }

        Ok(Self { key, file })
    }
}

impl Drop for LogLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.key.display(), error = %e, "failed to release WAL lock");
        }
        forget(&self.key);
    }
}

fn forget(key: &Path) {
    held()
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .remove(key);
}
