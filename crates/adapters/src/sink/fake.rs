// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake persistence sink for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{PersistenceSink, SinkError};
use ecl_core::Record;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the fake answers the next `save_batch`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FakeBehavior {
    #[default]
    Accept,
    Fail,
    Panic,
}

#[derive(Default)]
struct FakeState {
    saved: Vec<Vec<Record>>,
    attempts: usize,
    behavior: FakeBehavior,
    delay: Duration,
}

/// Fake sink that records every accepted batch
#[derive(Clone, Default)]
pub struct FakeSink {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose every call fails
    pub fn failing() -> Self {
        let sink = Self::new();
        sink.set_behavior(FakeBehavior::Fail);
        sink
    }

    pub fn set_behavior(&self, behavior: FakeBehavior) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).behavior = behavior;
    }

    /// Sleep this long inside every call
    pub fn set_delay(&self, delay: Duration) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).delay = delay;
    }

    /// Accepted batches, in call order
    pub fn batches(&self) -> Vec<Vec<Record>> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .saved
            .clone()
    }

    /// Accepted records, flattened
    pub fn records(&self) -> Vec<Record> {
        self.batches().into_iter().flatten().collect()
    }

    /// Calls made, including failed ones
    pub fn attempts(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).attempts
    }
}

impl PersistenceSink for FakeSink {
    fn save_batch(&self, batch: &[Record]) -> Result<(), SinkError> {
        let (behavior, delay) = {
            let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            state.attempts += 1;
            (state.behavior, state.delay)
        };

        // Sleep outside the lock so concurrent callers overlap
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        match behavior {
            FakeBehavior::Accept => {
                self.inner
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .saved
                    .push(batch.to_vec());
                Ok(())
            }
            FakeBehavior::Fail => Err(SinkError::Rejected("injected failure".to_string())),
            #[allow(clippy::panic)]
            FakeBehavior::Panic => panic!("injected panic"),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
