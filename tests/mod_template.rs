mod common;

use bson::doc;
use common::{Recorded, RecordingAdapter};
use querylite::Store;
use std::sync::Arc;

#[test]
fn template_instances_merge_new_criteria() {
    let adapter = Arc::new(RecordingAdapter::new());
    let tickets = Store::new(adapter.clone()).collection("tickets");

    let open_tickets = tickets.query().filter("status", "open").to_template();
    open_tickets
        .query_with(doc! { "owner": "me" }, None)
        .fetch()
        .exec()
        .unwrap();

    match adapter.last_call() {
        Some(Recorded::Find(cmd)) => {
            assert_eq!(cmd.conditions, doc! { "status": "open", "owner": "me" });
        }
        other => panic!("expected a find call, got {other:?}"),
    }
}

#[test]
fn mutating_an_instance_never_touches_the_template() {
    let adapter = Arc::new(RecordingAdapter::new());
    let tickets = Store::new(adapter).collection("tickets");
    let template = tickets.query().filter("status", "open").to_template();

    let _ = template.query().filter("status", "closed").filter("extra", 1_i32);

    let fresh = template.query();
    assert_eq!(fresh.conditions(), &doc! { "status": "open" });
    assert!(fresh.pending_update().is_empty());
}

#[test]
fn templates_capture_projection_update_and_options() {
    let adapter = Arc::new(RecordingAdapter::new());
    let tickets = Store::new(adapter.clone()).collection("tickets");
    let template = tickets
        .query()
        .select("title status")
        .sort("-age")
        .limit(3)
        .to_template();

    template.query().fetch().exec().unwrap();
    match adapter.last_call() {
        Some(Recorded::Find(cmd)) => {
            assert_eq!(cmd.projection, Some(doc! { "title": 1_i32, "status": 1_i32 }));
            assert_eq!(cmd.sort, Some(doc! { "age": -1_i32 }));
            assert_eq!(cmd.limit, Some(3));
        }
        other => panic!("expected a find call, got {other:?}"),
    }
}

#[test]
fn operation_is_not_inherited() {
    let adapter = Arc::new(RecordingAdapter::new());
    let tickets = Store::new(adapter.clone()).collection("tickets");
    // Built from a remove-declared builder, but instances decide their own
    // terminal operation.
    let template = tickets.remove().filter("status", "stale").to_template();
    template.query().count().exec().unwrap();
    assert!(matches!(adapter.last_call(), Some(Recorded::Count(_))));
}

#[test]
fn option_bags_apply_to_instances() {
    let adapter = Arc::new(RecordingAdapter::new());
    let tickets = Store::new(adapter.clone()).collection("tickets");
    let template = tickets.query().filter("status", "open").to_template();
    template
        .query_with(doc! {}, Some(doc! { "limit": 7_i32, "sort": { "age": 1_i32 } }))
        .fetch()
        .exec()
        .unwrap();
    match adapter.last_call() {
        Some(Recorded::Find(cmd)) => {
            assert_eq!(cmd.limit, Some(7));
            assert_eq!(cmd.sort, Some(doc! { "age": 1_i32 }));
        }
        other => panic!("expected a find call, got {other:?}"),
    }
}
