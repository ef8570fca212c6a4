// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable storage for change records: write-ahead log, checkpoint, backup

mod backup;
mod checkpoint;
mod lock;
mod wal;

pub use wal::{DurableLog, LogPaths, WalError};
