// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op sink for when persistence is handled elsewhere.

use super::{PersistenceSink, SinkError};
use ecl_core::Record;

/// Sink that accepts and discards every batch.
///
/// The WAL still holds every record, so this is enough for deployments that
/// only need the durable log.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpSink;

impl NoOpSink {
    pub fn new() -> Self {
        Self
    }
}

impl PersistenceSink for NoOpSink {
    fn save_batch(&self, _batch: &[Record]) -> Result<(), SinkError> {
        Ok(())
    }
}
