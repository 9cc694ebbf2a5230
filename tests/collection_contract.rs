//! Purpose: Contract coverage for the public collection API.
//! Exports: Integration tests only.
//! Role: Pin id assignment, copy-on-read isolation, lookup, update, and removal behavior.
//! Invariants: Tests use only `fixturedb::api` so they track the public surface.

use fixturedb::api::{Query, Record, RecordCollection, RecordId, Target};
use serde_json::{Value, json};

fn record(value: Value) -> Record {
    Record::from_json(value).expect("record object")
}

fn names(records: &[Record]) -> Vec<Value> {
    records
        .iter()
        .map(|r| r.get("name").cloned().unwrap_or(Value::Null))
        .collect()
}

#[test]
fn sequential_inserts_assign_ids_one_to_n() {
    let mut collection = RecordCollection::new("users");
    for n in 1..=5i64 {
        let inserted = collection.insert(record(json!({"name": format!("u{n}")})));
        assert_eq!(inserted.id(), Some(RecordId::Int(n)));
    }
    assert_eq!(collection.len(), 5);
}

#[test]
fn insert_without_id_uses_current_length_plus_one() {
    let mut collection =
        RecordCollection::with_records("users", vec![record(json!({"id": 10})), record(json!({"id": 20}))]);
    let inserted = collection.insert(Record::new());
    assert_eq!(inserted.id(), Some(RecordId::Int(3)));
}

#[test]
fn returned_copies_do_not_alias_storage() {
    let mut collection = RecordCollection::new("users");
    let mut inserted = collection.insert(record(json!({"name": "a"})));
    inserted.set("name", "mutated");

    let mut all = collection.all();
    all[0].set("name", "mutated");

    let mut found = collection.find(1).expect("found");
    found.set("name", "mutated");

    let mut matched = collection.find_where(&Query::fields(record(json!({"name": "a"}))));
    matched[0].set("name", "mutated");

    let mut updated = collection.update(1, &record(json!({"seen": true})));
    updated[0].set("name", "mutated");

    assert_eq!(
        collection.all()[0].clone().into_value(),
        json!({"id": 1, "name": "a", "seen": true})
    );
}

#[test]
fn find_many_omits_misses() {
    let collection = RecordCollection::from_value("users", json!([{"name": "a"}, {"name": "b"}])).unwrap();
    let found = collection.find_many([1, 2, 999]);
    assert_eq!(names(&found), vec![json!("a"), json!("b")]);
    assert!(collection.find(999).is_none());
}

#[test]
fn where_matches_on_field_equality() {
    let mut collection = RecordCollection::new("things");
    collection.insert(record(json!({"type": "a"})));
    collection.insert(record(json!({"type": "b"})));
    let matched = collection.find_where(&Query::fields(record(json!({"type": "a"}))));
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].id(), Some(RecordId::Int(1)));
}

#[test]
fn where_accepts_predicates_in_storage_order() {
    let collection = RecordCollection::from_value(
        "scores",
        json!([{"score": 5}, {"score": 50}, {"score": 500}]),
    )
    .unwrap();
    let query = Query::predicate(|r| r.get("score").and_then(Value::as_i64).unwrap_or(0) > 10);
    let ids: Vec<_> = collection
        .find_where(&query)
        .iter()
        .filter_map(Record::id)
        .collect();
    assert_eq!(ids, vec![RecordId::Int(2), RecordId::Int(3)]);
}

#[test]
fn update_by_id_changes_only_that_record() {
    let mut collection = RecordCollection::from_value(
        "users",
        json!([{"name": "a"}, {"name": "b"}, {"name": "c"}]),
    )
    .unwrap();
    let updated = collection.update_id(1, &record(json!({"name": "x"}))).expect("updated");
    assert_eq!(updated.get("name"), Some(&json!("x")));
    assert_eq!(names(&collection.all()), vec![json!("x"), json!("b"), json!("c")]);
}

#[test]
fn bulk_update_returns_changed_subset() {
    let mut collection = RecordCollection::from_value(
        "flags",
        json!([{"flag": true}, {"flag": false}, {}]),
    )
    .unwrap();
    let changed = collection.update(Target::All, &record(json!({"flag": true})));
    let ids: Vec<_> = changed.iter().filter_map(Record::id).collect();
    assert_eq!(ids, vec![RecordId::Int(2), RecordId::Int(3)]);
    assert!(collection.all().iter().all(|r| r.get("flag") == Some(&json!(true))));

    assert!(collection.update_all(&record(json!({"flag": true}))).is_empty());
}

#[test]
fn bulk_update_treats_equal_numbers_as_unchanged() {
    let mut collection =
        RecordCollection::from_value("counters", json!([{"n": 1}, {"n": 2}])).unwrap();
    let changed = collection.update(Target::All, &record(json!({"n": 1.0})));
    let ids: Vec<_> = changed.iter().filter_map(Record::id).collect();
    assert_eq!(ids, vec![RecordId::Int(2)]);
}

#[test]
fn remove_by_id_shrinks_collection() {
    let mut collection = RecordCollection::from_value(
        "users",
        json!([{"name": "a"}, {"name": "b"}, {"name": "c"}]),
    )
    .unwrap();
    assert_eq!(collection.remove(2), 1);
    assert_eq!(collection.len(), 2);
    assert!(collection.find(2).is_none());
    assert_eq!(names(&collection.all()), vec![json!("a"), json!("c")]);
}

#[test]
fn remove_without_match_is_noop() {
    let mut collection = RecordCollection::from_value("users", json!([{"name": "a"}])).unwrap();
    assert_eq!(collection.remove(record(json!({"name": "zzz"}))), 0);
    assert_eq!(collection.remove(vec![RecordId::Int(8)]), 0);
    assert_eq!(collection.len(), 1);
}

#[test]
fn first_or_create_inserts_when_missing() {
    let mut collection = RecordCollection::from_value("things", json!([{"type": "b"}])).unwrap();
    let created = collection.first_or_create(&record(json!({"type": "a"})), &record(json!({"count": 0})));
    assert_eq!(created.into_value(), json!({"type": "a", "count": 0, "id": 2}));

    let again = collection.first_or_create(&record(json!({"type": "a"})), &record(json!({"count": 9})));
    assert_eq!(again.get("count"), Some(&json!(0)));
    assert_eq!(collection.len(), 2);
}

#[test]
fn expression_queries_drive_update_and_remove() {
    let mut collection = RecordCollection::from_value(
        "users",
        json!([{"age": 17}, {"age": 30}, {"age": 64}]),
    )
    .unwrap();
    let adults = Query::expr(".age >= 18").unwrap();
    assert_eq!(collection.update(adults.clone(), &record(json!({"adult": true}))).len(), 2);
    assert_eq!(collection.remove(adults), 2);
    assert_eq!(collection.all()[0].get("age"), Some(&json!(17)));
}
