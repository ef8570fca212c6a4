// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Support code for the `ecld` ingestion daemon

pub mod args;
pub mod input;

pub use args::{Args, Settings};
pub use input::{ingest_line, parse_line, ChangeRequest, IngestStats, InputError};
