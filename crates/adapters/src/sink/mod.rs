// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence adapters that receive flushed batches

mod jsonl;
mod noop;

pub use jsonl::JsonlSink;
pub use noop::NoOpSink;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeBehavior, FakeSink};

use ecl_core::Record;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Errors from persisting a batch
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("batch rejected: {0}")]
    Rejected(String),
}

/// Destination for batches of records.
///
/// A call either stores the whole batch or fails; the caller does not retry.
/// Implementations are shared across worker threads.
pub trait PersistenceSink: Send + Sync + 'static {
    fn save_batch(&self, batch: &[Record]) -> Result<(), SinkError>;
}

impl<S: PersistenceSink> PersistenceSink for Arc<S> {
    fn save_batch(&self, batch: &[Record]) -> Result<(), SinkError> {
        (**self).save_batch(batch)
    }
}
