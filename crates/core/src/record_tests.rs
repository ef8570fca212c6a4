// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn some(s: &str) -> Option<String> {
    Some(s.to_string())
}

fn user(id: &str) -> EntityRef {
    EntityRef::new("User", id).unwrap()
}

#[test]
fn record_ids_are_unique() {
    let a = Record::new(user("1"), Operation::Create, ChangeSet::empty());
    let b = Record::new(user("1"), Operation::Create, ChangeSet::empty());
    assert_ne!(a.id(), b.id());
    assert_eq!(a.id().to_string().len(), 36); // UUID format
}

#[test]
fn record_id_survives_serialization() {
    let changes = ChangeSet::from_pairs(vec![(
        "email".to_string(),
        some("a@example.com"),
        some("b@example.com"),
    )])
    .unwrap();
    let record = Record::new(user("42"), Operation::Update, changes);

    let json = serde_json::to_string(&record).unwrap();
    let parsed: Record = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.id(), record.id());
    assert_eq!(parsed, record);
}

#[test]
fn record_serializes_to_a_single_line() {
    let changes = ChangeSet::from_pairs(vec![(
        "bio".to_string(),
        None,
        some("line one\nline two"),
    )])
    .unwrap();
    let record = Record::new(user("7"), Operation::Create, changes);

    let json = serde_json::to_string(&record).unwrap();
    assert!(!json.contains('\n'));
}

#[test]
fn record_without_context_omits_field() {
    let record = Record::new(user("1"), Operation::Delete, ChangeSet::empty()).with_context(None);
    let json = serde_json::to_string(&record).unwrap();
    assert!(!json.contains("context"));
    assert!(record.context().is_none());
}

#[test]
fn new_record_captures_submission_context() {
    let record = Record::new(user("1"), Operation::Create, ChangeSet::empty());
    let context = record.context().unwrap();
    assert!(!context.hostname.is_empty());
    assert!(context.submitted_at >= record.created_at() - chrono::Duration::seconds(1));
}

#[test]
fn entity_ref_rejects_blank_parts() {
    assert_eq!(
        EntityRef::new(" ", "1").unwrap_err(),
        RecordError::BlankEntity("name")
    );
    assert_eq!(
        EntityRef::new("User", "").unwrap_err(),
        RecordError::BlankEntity("id")
    );
    assert_eq!(user("9").to_string(), "User[9]");
}

#[test]
fn submission_context_hostname_is_stable() {
    let a = SubmissionContext::current();
    let b = SubmissionContext::current();
    assert!(!a.hostname.trim().is_empty());
    assert_eq!(a.hostname, b.hostname);
}

fn record_json(entity: serde_json::Value, changes: usize) -> String {
    let changes: serde_json::Map<_, _> = (0..changes)
        .map(|i| {
            (
                format!("f{}", i),
                serde_json::json!({ "new_value": i.to_string(), "kind": "created" }),
            )
        })
        .collect();
    serde_json::json!({
        "id": "00000000-0000-4000-8000-000000000001",
        "entity": entity,
        "operation": "CREATE",
        "changes": changes,
        "created_at": "2026-01-01T00:00:00Z",
    })
    .to_string()
}

#[test]
fn deserialize_accepts_valid_record() {
    let json = record_json(serde_json::json!({ "name": "User", "id": "1" }), MAX_CHANGES);
    let record: Record = serde_json::from_str(&json).unwrap();
    assert_eq!(record.changes().len(), MAX_CHANGES);
    assert_eq!(record.entity().to_string(), "User[1]");
}

#[test]
fn deserialize_rejects_oversized_change_set() {
    let json = record_json(serde_json::json!({ "name": "User", "id": "1" }), 150);
    let err = serde_json::from_str::<Record>(&json).unwrap_err();
    assert!(err.to_string().contains("too many field changes"), "{}", err);
}

#[test]
fn deserialize_rejects_blank_entity() {
    let json = record_json(serde_json::json!({ "name": "", "id": "" }), 1);
    let err = serde_json::from_str::<Record>(&json).unwrap_err();
    assert!(err.to_string().contains("must not be blank"), "{}", err);
}

#[test]
fn change_set_serializes_as_plain_map() {
    let changes = ChangeSet::from_pairs(vec![("email".to_string(), None, some("a"))]).unwrap();
    let json = serde_json::to_string(&changes).unwrap();
    assert_eq!(json, r#"{"email":{"new_value":"a","kind":"created"}}"#);
}

use yare::parameterized;

#[parameterized(
    create = { "CREATE", Some(Operation::Create) },
    insert = { "insert", Some(Operation::Create) },
    save = { "Save", Some(Operation::Create) },
    update = { "update", Some(Operation::Update) },
    merge = { "MERGE", Some(Operation::Update) },
    delete = { "DELETE", Some(Operation::Delete) },
    remove = { " remove ", Some(Operation::Delete) },
    unknown = { "upsert", None },
)]
fn operation_aliases(alias: &str, expected: Option<Operation>) {
    assert_eq!(Operation::from_alias(alias), expected);
    assert_eq!(alias.parse::<Operation>().ok(), expected);
}

#[test]
fn operation_serializes_uppercase() {
    assert_eq!(
        serde_json::to_string(&Operation::Update).unwrap(),
        "\"UPDATE\""
    );
}

#[parameterized(
    created = { None, Some("x"), ChangeKind::Created, true },
    deleted = { Some("x"), None, ChangeKind::Deleted, true },
    modified = { Some("x"), Some("y"), ChangeKind::Modified, true },
    unchanged = { Some("x"), Some("x"), ChangeKind::Modified, false },
    both_missing = { None, None, ChangeKind::Modified, false },
)]
fn field_change_kind(old: Option<&str>, new: Option<&str>, kind: ChangeKind, significant: bool) {
    let change = FieldChange::new(old.map(str::to_string), new.map(str::to_string));
    assert_eq!(change.kind(), kind);
    assert_eq!(change.is_significant(), significant);
}

#[test]
fn contextual_change_is_not_significant() {
    let change = FieldChange::contextual("request-17");
    assert_eq!(change.kind(), ChangeKind::Contextual);
    assert!(!change.is_significant());
}

#[test]
fn change_set_filters_insignificant_pairs() {
    let changes = ChangeSet::from_pairs(vec![
        ("name".to_string(), some("old"), some("new")),
        ("status".to_string(), some("active"), some("active")),
        ("email".to_string(), None, some("a@example.com")),
    ])
    .unwrap();

    assert_eq!(changes.len(), 2);
    assert!(changes.get("status").is_none());
    let fields: Vec<_> = changes.iter().map(|(field, _)| field).collect();
    assert_eq!(fields, vec!["email", "name"]);
}

#[test]
fn change_set_rejects_too_many_changes() {
    let pairs = (0..=MAX_CHANGES).map(|i| (format!("f{}", i), None, Some(i.to_string())));
    assert_eq!(
        ChangeSet::from_pairs(pairs).unwrap_err(),
        RecordError::TooManyChanges(MAX_CHANGES + 1)
    );
}

// Property-based tests
use proptest::prelude::*;

fn arb_value() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[a-c]{0,2}")
}

proptest! {
    #[test]
    fn change_set_keeps_only_significant_changes(
        pairs in proptest::collection::vec(("[a-z]{1,4}", arb_value(), arb_value()), 0..40)
    ) {
        let changes = ChangeSet::from_pairs(pairs).unwrap();
        for (_, change) in changes.iter() {
            prop_assert!(change.is_significant());
        }
    }
}
