// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change records: the unit of work flowing through the pipeline
//!
//! A [`Record`] is built once by the change-capture layer and never mutated
//! afterwards. Its identifier survives serialization, so the same record can
//! be matched between the WAL and the persistence sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;
use uuid::Uuid;

/// Upper bound on field changes carried by a single record
pub const MAX_CHANGES: usize = 100;

/// Errors raised while building record parts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("too many field changes: {0} (max {MAX_CHANGES})")]
    TooManyChanges(usize),
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
    #[error("entity {0} must not be blank")]
    BlankEntity(&'static str),
}

/// Random 128-bit record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Kind of change a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "CREATE",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }

    /// Resolve an ORM-style verb (`INSERT`, `MERGE`, `REMOVE`, ...) to an operation.
    ///
    /// Matching is case-insensitive. Canonical names are accepted too.
    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias.trim().to_ascii_uppercase().as_str() {
            "CREATE" | "INSERT" | "SAVE" => Some(Operation::Create),
            "UPDATE" | "MERGE" => Some(Operation::Update),
            "DELETE" | "REMOVE" => Some(Operation::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_alias(s).ok_or_else(|| RecordError::UnknownOperation(s.to_string()))
    }
}

/// Identity of the entity a change applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawEntityRef")]
pub struct EntityRef {
    name: String,
    id: String,
}

#[derive(Deserialize)]
struct RawEntityRef {
    name: String,
    id: String,
}

impl TryFrom<RawEntityRef> for EntityRef {
    type Error = RecordError;

    fn try_from(raw: RawEntityRef) -> Result<Self, Self::Error> {
        Self::new(raw.name, raw.id)
    }
}

impl EntityRef {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Result<Self, RecordError> {
        let name = name.into();
        let id = id.into();
        if name.trim().is_empty() {
            return Err(RecordError::BlankEntity("name"));
        }
        if id.trim().is_empty() {
            return Err(RecordError::BlankEntity("id"));
        }
        Ok(Self { name, id })
    }

    /// Entity type name (e.g. `User`)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.id)
    }
}

/// How a single field changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
    /// Extra context attached to a change set, not a field of the entity
    Contextual,
}

/// Old and new value of one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    new_value: Option<String>,
    kind: ChangeKind,
}

impl FieldChange {
    /// Build a change, deriving its kind from which sides are present
    pub fn new(old_value: Option<String>, new_value: Option<String>) -> Self {
        let kind = match (&old_value, &new_value) {
            (None, Some(_)) => ChangeKind::Created,
            (Some(_), None) => ChangeKind::Deleted,
            _ => ChangeKind::Modified,
        };
        Self {
            old_value,
            new_value,
            kind,
        }
    }

    pub fn contextual(value: impl Into<String>) -> Self {
        Self {
            old_value: None,
            new_value: Some(value.into()),
            kind: ChangeKind::Contextual,
        }
    }

    pub fn old_value(&self) -> Option<&str> {
        self.old_value.as_deref()
    }

    pub fn new_value(&self) -> Option<&str> {
        self.new_value.as_deref()
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    /// Whether this change is worth logging on its own
    pub fn is_significant(&self) -> bool {
        match self.kind {
            ChangeKind::Created | ChangeKind::Deleted => true,
            ChangeKind::Modified => self.old_value != self.new_value,
            ChangeKind::Contextual => false,
        }
    }
}

/// Field name to change mapping, ordered by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, FieldChange>",
    into = "BTreeMap<String, FieldChange>"
)]
pub struct ChangeSet(BTreeMap<String, FieldChange>);

impl TryFrom<BTreeMap<String, FieldChange>> for ChangeSet {
    type Error = RecordError;

    fn try_from(changes: BTreeMap<String, FieldChange>) -> Result<Self, Self::Error> {
        Self::new(changes)
    }
}

impl From<ChangeSet> for BTreeMap<String, FieldChange> {
    fn from(changes: ChangeSet) -> Self {
        changes.0
    }
}

impl ChangeSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(changes: BTreeMap<String, FieldChange>) -> Result<Self, RecordError> {
        if changes.len() > MAX_CHANGES {
            return Err(RecordError::TooManyChanges(changes.len()));
        }
        Ok(Self(changes))
    }

    /// Build from raw `(field, old, new)` triples, keeping only significant changes
    pub fn from_pairs<I>(pairs: I) -> Result<Self, RecordError>
    where
        I: IntoIterator<Item = (String, Option<String>, Option<String>)>,
    {
        let changes = pairs
            .into_iter()
            .map(|(field, old, new)| (field, FieldChange::new(old, new)))
            .filter(|(_, change)| change.is_significant())
            .collect();
        Self::new(changes)
    }

    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.0.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldChange)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Where and when a record was submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_name: Option<String>,
    pub hostname: String,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionContext {
    /// Capture the calling thread, host and current time
    pub fn current() -> Self {
        Self {
            thread_name: std::thread::current().name().map(str::to_string),
            hostname: hostname().to_string(),
            submitted_at: Utc::now(),
        }
    }
}

/// Host name, resolved on first use
fn hostname() -> &'static str {
    static HOSTNAME: OnceLock<String> = OnceLock::new();
    HOSTNAME.get_or_init(|| {
        hostname::get()
            .map(|s| s.to_string_lossy().trim().to_string())
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "localhost".to_string())
    })
}

/// One immutable change event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    entity: EntityRef,
    operation: Operation,
    changes: ChangeSet,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<SubmissionContext>,
}

impl Record {
    /// Create a record with a fresh id, the current time and the caller's context
    pub fn new(entity: EntityRef, operation: Operation, changes: ChangeSet) -> Self {
        Self {
            id: RecordId::generate(),
            entity,
            operation,
            changes,
            created_at: Utc::now(),
            context: Some(SubmissionContext::current()),
        }
    }

    /// Replace the submission context (e.g. when the producer supplies its own)
    pub fn with_context(self, context: Option<SubmissionContext>) -> Self {
        Self { context, ..self }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn context(&self) -> Option<&SubmissionContext> {
        self.context.as_ref()
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
