mod common;

use bson::doc;
use common::{Recorded, RecordingAdapter};
use querylite::errors::QueryError;
use querylite::{Collection, Store};
use std::sync::Arc;

fn users(adapter: &Arc<RecordingAdapter>) -> Collection {
    Store::new(adapter.clone()).collection("users")
}

#[test]
fn fetch_compiles_conditions_and_options() {
    let adapter = Arc::new(RecordingAdapter::new());
    let found = users(&adapter)
        .find()
        .field("age")
        .gte(21)
        .field("age")
        .lte(65)
        .sort("-age")
        .limit(10)
        .fetch()
        .exec()
        .unwrap();
    assert!(found.is_empty());

    match adapter.last_call() {
        Some(Recorded::Find(cmd)) => {
            assert_eq!(cmd.collection, "users");
            assert_eq!(cmd.conditions, doc! { "age": { "$gte": 21_i32, "$lte": 65_i32 } });
            assert_eq!(cmd.sort, Some(doc! { "age": -1_i32 }));
            assert_eq!(cmd.limit, Some(10));
        }
        other => panic!("expected a find call, got {other:?}"),
    }
}

#[test]
fn unexecuted_pending_never_reaches_the_adapter() {
    let adapter = Arc::new(RecordingAdapter::new());
    let pending = users(&adapter).query().remove();
    drop(pending);
    assert_eq!(adapter.call_count(), 0);
}

#[test]
fn forced_remove_dispatches_exactly_once() {
    let adapter = Arc::new(RecordingAdapter::new());
    let report = users(&adapter).query().remove().exec().unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(adapter.call_count(), 1);
    match adapter.last_call() {
        Some(Recorded::Remove(cmd)) => {
            assert!(cmd.conditions.is_empty());
            assert!(!cmd.single);
        }
        other => panic!("expected a remove call, got {other:?}"),
    }
}

#[test]
fn delete_one_flags_single() {
    let adapter = Arc::new(RecordingAdapter::new());
    users(&adapter).query().filter("a", 1).delete_one().exec().unwrap();
    match adapter.last_call() {
        Some(Recorded::Remove(cmd)) => assert!(cmd.single),
        other => panic!("expected a remove call, got {other:?}"),
    }
}

#[test]
fn find_one_and_update_defaults_new_true_upsert_false() {
    let adapter = Arc::new(RecordingAdapter::new());
    let _ = users(&adapter)
        .query()
        .filter("id", 1)
        .find_one_and_update(doc! { "$set": { "x": 1_i32 } })
        .exec()
        .unwrap();
    match adapter.last_call() {
        Some(Recorded::FindAndModify(cmd)) => {
            assert!(cmd.return_new);
            assert!(!cmd.upsert);
            assert_eq!(cmd.update, Some(doc! { "$set": { "x": 1_i32 } }));
            assert_eq!(cmd.conditions, doc! { "id": 1_i32 });
        }
        other => panic!("expected findAndModify, got {other:?}"),
    }
}

#[test]
fn callback_and_future_paths_share_one_dispatch() {
    let adapter = Arc::new(RecordingAdapter::new());
    let mut observed = None;
    users(&adapter).find().filter("a", 1).count().exec_with(|result| {
        observed = Some(result.unwrap());
    });
    assert_eq!(observed, Some(0));
    assert_eq!(adapter.call_count(), 1);
}

#[tokio::test]
async fn awaiting_a_pending_dispatches_once() {
    let adapter = Arc::new(RecordingAdapter::new());
    let docs = users(&adapter).find().filter("a", 1).fetch().await.unwrap();
    assert!(docs.is_empty());
    assert_eq!(adapter.call_count(), 1);
}

#[test]
fn adapter_errors_pass_through_unchanged() {
    let adapter = Arc::new(RecordingAdapter::new());
    adapter.fail_with("socket reset");
    let err = users(&adapter).find().fetch().exec().unwrap_err();
    match err {
        QueryError::Adapter(message) => assert_eq!(message, "socket reset"),
        other => panic!("expected adapter error, got {other}"),
    }
    // The call was made; no retries happen on top of it.
    assert_eq!(adapter.call_count(), 1);
}

#[test]
fn chain_errors_surface_before_any_io() {
    let adapter = Arc::new(RecordingAdapter::new());
    let err = users(&adapter).find().gt(5).fetch().exec().unwrap_err();
    assert!(matches!(err, QueryError::State { call: "gt", .. }));
    assert!(err.is_builder_error());
    assert_eq!(adapter.call_count(), 0);
}

#[test]
fn max_time_and_read_preference_are_forwarded() {
    let adapter = Arc::new(RecordingAdapter::new());
    users(&adapter)
        .find()
        .max_time_ms(250)
        .read_preference(querylite::ReadPreference::Secondary)
        .comment("routing test")
        .fetch()
        .exec()
        .unwrap();
    match adapter.last_call() {
        Some(Recorded::Find(cmd)) => {
            assert_eq!(cmd.max_time_ms, Some(250));
            assert_eq!(cmd.read_preference, Some(querylite::ReadPreference::Secondary));
            assert_eq!(cmd.comment.as_deref(), Some("routing test"));
        }
        other => panic!("expected a find call, got {other:?}"),
    }
}
