// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable-offset marker for the write-ahead log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Byte position into the log known to be durable, and when it became so
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub position: u64,
    pub timestamp: DateTime<Utc>,
}

impl Checkpoint {
    /// Checkpoint at `position`, stamped now
    pub fn at(position: u64) -> Self {
        Self {
            position,
            timestamp: Utc::now(),
        }
    }

    /// Checkpoint for an empty log
    pub fn origin() -> Self {
        Self::at(0)
    }

    /// Move forward by `len` bytes, restamping
    pub fn advanced_by(&self, len: u64) -> Self {
        Self::at(self.position.saturating_add(len))
    }

    /// A checkpoint beyond the end of the file means bytes were lost
    pub fn exceeds(&self, file_size: u64) -> bool {
        self.position > file_size
    }
}
