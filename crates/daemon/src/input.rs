// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NDJSON change requests read from stdin
//!
//! One request per line:
//!
//! ```json
//! {"entity":"User","entity_id":"42","operation":"UPDATE","changes":{"email":{"old":"a@x","new":"b@x"}}}
//! ```
//!
//! `operation` accepts the usual aliases (`INSERT`, `SAVE`, `MERGE`,
//! `REMOVE`). Non-string values are stored in their JSON form.

use ecl_adapters::{MetricsSink, PersistenceSink};
use ecl_core::{ChangeSet, EntityRef, Operation, Record, RecordError};
use ecl_engine::{Coordinator, Logged};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{error, warn};

/// Errors turning a line into a record
#[derive(Debug, Error)]
pub enum InputError {
    #[error("malformed request: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid request: {0}")]
    Record(#[from] RecordError),
}

/// Old and new value of one field in a request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldValues {
    #[serde(default)]
    pub old: Option<Value>,
    #[serde(default)]
    pub new: Option<Value>,
}

/// One change as submitted by a producer
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangeRequest {
    pub entity: String,
    pub entity_id: Value,
    pub operation: String,
    #[serde(default)]
    pub changes: BTreeMap<String, FieldValues>,
}

impl ChangeRequest {
    pub fn into_record(self) -> Result<Record, InputError> {
        let operation: Operation = self.operation.parse()?;
        let entity = EntityRef::new(self.entity, text(self.entity_id))?;
        let changes = ChangeSet::from_pairs(
            self.changes
                .into_iter()
                .map(|(field, v)| (field, v.old.and_then(value_text), v.new.and_then(value_text))),
        )?;
        Ok(Record::new(entity, operation, changes))
    }
}

/// JSON null counts as absent
fn value_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => Some(text(other)),
    }
}

fn text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Parse one input line; blank lines yield `None`
pub fn parse_line(line: &str) -> Result<Option<Record>, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let request: ChangeRequest = serde_json::from_str(line)?;
    request.into_record().map(Some)
}

/// Running totals for one ingestion session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub lines: u64,
    pub queued: u64,
    pub dropped: u64,
    pub skipped: u64,
    pub rejected: u64,
    pub failed: u64,
}

/// Parse `line` and hand the record to `coordinator`, updating `stats`.
///
/// Bad input and WAL failures are logged and counted; ingestion carries on.
pub fn ingest_line<S, M>(coordinator: &Coordinator<S, M>, line: &str, stats: &mut IngestStats)
where
    S: PersistenceSink,
    M: MetricsSink,
{
    stats.lines += 1;
    let record = match parse_line(line) {
        Ok(Some(record)) => record,
        Ok(None) => return,
        Err(e) => {
            warn!(line = stats.lines, error = %e, "rejected input line");
            stats.rejected += 1;
            return;
        }
    };

    match coordinator.log_change(record) {
        Ok(Logged::Queued) => stats.queued += 1,
        Ok(Logged::Dropped) => stats.dropped += 1,
        Ok(Logged::Skipped) => stats.skipped += 1,
        Err(e) => {
            error!(line = stats.lines, error = %e, "failed to log change");
            stats.failed += 1;
        }
    }
}

#[cfg(test)]
#[path = "input_tests.rs"]
mod tests;
