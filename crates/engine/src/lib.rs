// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Entity change log ingestion engine

mod error;
mod lifecycle;
mod processor;
mod queue;
mod signal;

pub use error::LifecycleError;
pub use lifecycle::{Coordinator, Logged, ShutdownReport, State};
pub use processor::{BatchProcessor, FinalFlush, WorkerPool};
pub use queue::BoundedQueue;
pub use signal::StopSignal;
