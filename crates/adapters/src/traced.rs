// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::sink::{PersistenceSink, SinkError};
use ecl_core::Record;

/// Wrapper that adds tracing to any PersistenceSink
#[derive(Clone)]
pub struct TracedSink<S> {
    inner: S,
}

impl<S> TracedSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: PersistenceSink> PersistenceSink for TracedSink<S> {
    fn save_batch(&self, batch: &[Record]) -> Result<(), SinkError> {
        let span = tracing::info_span!("sink.save_batch", records = batch.len());
        let _guard = span.enter();

        if let (Some(first), Some(last)) = (batch.first(), batch.last()) {
            tracing::trace!(first = %first.id(), last = %last.id(), "saving");
        }

        let start = std::time::Instant::now();
        let result = self.inner.save_batch(batch);
        let elapsed = start.elapsed();

        match &result {
            Ok(()) => tracing::debug!(
                elapsed_ms = elapsed.as_millis() as u64,
                "batch saved"
            ),
            Err(e) => tracing::error!(
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "batch save failed"
            ),
        }

        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
