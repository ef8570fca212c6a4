// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the pipeline lifecycle

use crate::State;
use ecl_core::ConfigError;
use ecl_storage::WalError;
use std::io;
use thiserror::Error;

/// Errors surfaced to callers of the coordinator
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("initialization failed: {0}")]
    Init(#[source] WalError),
    #[error("initialization failed: invalid config: {0}")]
    Config(#[from] ConfigError),
    #[error("initialization failed: could not spawn {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("pipeline already {0}")]
    AlreadyStarted(State),
    #[error("pipeline is not running")]
    NotRunning,
    #[error("WAL write failed: {0}")]
    Write(#[source] WalError),
}
