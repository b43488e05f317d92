mod common;

use common::RecordingAdapter;
use querylite::errors::QueryError;
use querylite::{Op, Store};
use std::sync::Arc;

#[test]
fn sort_then_distinct_is_rejected_at_terminal_time() {
    let adapter = Arc::new(RecordingAdapter::new());
    let users = Store::new(adapter.clone()).collection("users");
    let err = users.query().sort("-age").distinct("name").exec().unwrap_err();
    match &err {
        QueryError::Validation { helper, operation } => {
            assert_eq!(*helper, "sort");
            assert_eq!(*operation, "distinct");
        }
        other => panic!("expected validation error, got {other}"),
    }
    assert_eq!(adapter.call_count(), 0);
}

#[test]
fn the_same_sort_is_fine_for_a_fetch() {
    let adapter = Arc::new(RecordingAdapter::new());
    let users = Store::new(adapter.clone()).collection("users");
    users.query().sort("-age").fetch().exec().unwrap();
    assert_eq!(adapter.call_count(), 1);
}

#[test]
fn helper_call_and_terminal_checks_produce_the_same_error() {
    let adapter = Arc::new(RecordingAdapter::new());
    let store = Store::new(adapter);
    let users = store.collection("users");

    // Operation declared up front: the helper call itself latches.
    let early = users.update().sort("-age");
    let early_err = early.chain_error().expect("sort should latch").clone();

    // Operation declared only by the terminal call: caught there instead.
    let late_err = users.query().sort("-age").update().exec().unwrap_err();

    assert_eq!(early_err.to_string(), late_err.to_string());
    assert!(matches!(late_err, QueryError::Validation { helper: "sort", operation: "update" }));
}

#[test]
fn projection_helpers_are_rejected_for_writes() {
    let adapter = Arc::new(RecordingAdapter::new());
    let users = Store::new(adapter).collection("users");
    let q = users.remove().select("name");
    assert!(matches!(
        q.chain_error(),
        Some(QueryError::Validation { helper: "select", operation: "remove" })
    ));
}

#[test]
fn count_refuses_cursor_and_pagination_knobs() {
    let adapter = Arc::new(RecordingAdapter::new());
    let users = Store::new(adapter.clone()).collection("users");
    users.query().hint(bson::doc! { "age": 1_i32 }).count().exec().unwrap();
    assert_eq!(adapter.call_count(), 1);

    let err = users.query().limit(5).count().exec().unwrap_err();
    assert!(matches!(err, QueryError::Validation { helper: "limit", operation: "count" }));

    let err = users.query().skip(2).count().exec().unwrap_err();
    assert!(matches!(err, QueryError::Validation { helper: "skip", operation: "count" }));

    let err = users.query().tailable(true).count().exec().unwrap_err();
    assert!(matches!(err, QueryError::Validation { helper: "tailable", operation: "count" }));
    assert_eq!(adapter.call_count(), 1);
}

#[test]
fn distinct_refuses_a_staged_update() {
    let adapter = Arc::new(RecordingAdapter::new());
    let users = Store::new(adapter.clone()).collection("users");
    let err = users
        .query()
        .update_doc(bson::doc! { "x": 1_i32 })
        .distinct("name")
        .exec()
        .unwrap_err();
    assert!(matches!(err, QueryError::State { call: "distinct", .. }));
    assert_eq!(adapter.call_count(), 0);
}

#[test]
fn operation_enum_names_match_wire_names() {
    assert_eq!(Op::Distinct.name(), "distinct");
    assert_eq!(Op::ReplaceOne.name(), "replaceOne");
}
