// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ecl-core: shared types for the entity change log pipeline
//!
//! This crate provides:
//! - The immutable change [`Record`] and its parts
//! - The WAL [`Checkpoint`] marker
//! - [`PipelineConfig`], the single configuration value passed to every component

pub mod checkpoint;
pub mod config;
pub mod record;

pub use checkpoint::Checkpoint;
pub use config::{
    BackupPolicy, CaptureConfig, ConfigError, PipelineConfig, ShutdownConfig,
};
pub use record::{
    ChangeKind, ChangeSet, EntityRef, FieldChange, Operation, Record, RecordError, RecordId,
    SubmissionContext,
};
