// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint file: load and atomic replace

use crate::wal::WalError;
use ecl_core::Checkpoint;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Read the checkpoint at `path`, if one was ever written
pub(crate) fn load(path: &Path) -> Result<Option<Checkpoint>, WalError> {
    let content = match fs::read(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_slice(&content)
        .map(Some)
        .map_err(|source| WalError::Checkpoint {
            path: path.to_path_buf(),
            source,
        })
}

/// Replace the checkpoint at `path` via write-to-temp and rename
pub(crate) fn store(path: &Path, checkpoint: &Checkpoint) -> Result<(), WalError> {
    let tmp = tmp_path(path);
    let json = serde_json::to_vec(checkpoint)?;
    {
        let mut file = File::create(&tmp)?;
        file.write_all(&json)?;
        file.sync_data()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
