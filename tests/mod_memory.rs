use bson::{Bson, doc};
use querylite::adapter::memory::MemoryAdapter;
use querylite::errors::QueryError;
use querylite::query::Near;
use querylite::{Collection, Store};
use std::sync::Arc;

fn seeded() -> (Arc<MemoryAdapter>, Collection) {
    let adapter = Arc::new(MemoryAdapter::new());
    adapter.insert("users", doc! { "name": "alice", "age": 30_i32, "info": { "visits": 1_i32 } });
    adapter.insert("users", doc! { "name": "bob", "age": 40_i32 });
    adapter.insert("users", doc! { "name": "carol", "age": 35_i32, "tags": ["admin", "ops"] });
    let users = Store::new(adapter.clone()).collection("users");
    (adapter, users)
}

#[test]
fn fetch_sorts_projects_and_paginates() {
    let (_, users) = seeded();
    let docs = users
        .find()
        .field("age")
        .gt(30)
        .sort("-age")
        .select("name")
        .limit(2)
        .fetch()
        .exec()
        .unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0], doc! { "name": "bob" });
    assert_eq!(docs[1], doc! { "name": "carol" });
}

#[test]
fn fetch_one_honors_sort_and_skip() {
    let (_, users) = seeded();
    let doc = users.find().sort("age").skip(1).fetch_one().exec().unwrap().unwrap();
    assert_eq!(doc.get_str("name").unwrap(), "carol");
}

#[test]
fn count_and_distinct() {
    let (_, users) = seeded();
    let n = users.query().field("age").gte(35).count().exec().unwrap();
    assert_eq!(n, 2);

    let tags = users.query().distinct("tags").exec().unwrap();
    assert_eq!(tags, vec![Bson::String("admin".into()), Bson::String("ops".into())]);
}

#[test]
fn update_applies_operators_with_dotted_paths() {
    let (adapter, users) = seeded();
    let report = users
        .query()
        .filter("name", "alice")
        .update_doc(doc! { "$inc": { "info.visits": 2_i32 }, "city": "berlin" })
        .update()
        .exec()
        .unwrap();
    assert_eq!(report.matched, 1);
    assert_eq!(report.modified, 1);

    let alice = users.find().filter("name", "alice").fetch_one().exec().unwrap().unwrap();
    assert_eq!(alice.get_document("info").unwrap().get_f64("visits").unwrap(), 3.0);
    assert_eq!(alice.get_str("city").unwrap(), "berlin");
    assert_eq!(adapter.len("users"), 3);
}

#[test]
fn upsert_seeds_from_equality_conditions() {
    let (adapter, users) = seeded();
    let report = users
        .query()
        .filter("name", "dora")
        .upsert(true)
        .update_doc(doc! { "age": 22_i32 })
        .update()
        .exec()
        .unwrap();
    assert_eq!(report.matched, 1);
    assert_eq!(adapter.len("users"), 4);

    let dora = users.find().filter("name", "dora").fetch_one().exec().unwrap().unwrap();
    assert_eq!(dora.get_i32("age").unwrap(), 22);
}

#[test]
fn find_one_and_update_returns_new_by_default_and_old_on_request() {
    let (_, users) = seeded();
    let new_doc = users
        .query()
        .filter("name", "bob")
        .find_one_and_update(doc! { "$inc": { "age": 1_i32 } })
        .exec()
        .unwrap()
        .unwrap();
    assert_eq!(new_doc.get_f64("age").unwrap(), 41.0);

    let old_doc = users
        .query()
        .filter("name", "bob")
        .return_new(false)
        .find_one_and_update(doc! { "$inc": { "age": 1_i32 } })
        .exec()
        .unwrap()
        .unwrap();
    assert_eq!(old_doc.get_f64("age").unwrap(), 41.0);
}

#[test]
fn find_one_and_remove_returns_the_victim() {
    let (adapter, users) = seeded();
    let gone = users
        .query()
        .filter("name", "carol")
        .find_one_and_remove()
        .exec()
        .unwrap()
        .unwrap();
    assert_eq!(gone.get_str("name").unwrap(), "carol");
    assert_eq!(adapter.len("users"), 2);
}

#[test]
fn remove_and_delete_one() {
    let (adapter, users) = seeded();
    let report = users.query().field("age").gte(0).delete_one().exec().unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(adapter.len("users"), 2);

    let report = users.query().remove().exec().unwrap();
    assert_eq!(report.removed, 2);
    assert!(adapter.is_empty("users"));
}

#[test]
fn geo_containment_filters_points() {
    let adapter = Arc::new(MemoryAdapter::new());
    let inside_id = adapter.insert("places", doc! { "name": "inside", "loc": [0.5, 0.5] });
    adapter.insert("places", doc! { "name": "outside", "loc": [5.0, 5.0] });
    assert_eq!(
        adapter.get("places", &inside_id).unwrap().get_str("name").unwrap(),
        "inside"
    );
    let places = Store::new(adapter).collection("places");

    let docs = places
        .find()
        .field("loc")
        .within()
        .box_([0.0, 0.0], [1.0, 1.0])
        .fetch()
        .exec()
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].get_str("name").unwrap(), "inside");
}

#[test]
fn near_is_refused_not_misevaluated() {
    let adapter = Arc::new(MemoryAdapter::new());
    adapter.insert("places", doc! { "loc": [0.5, 0.5] });
    let places = Store::new(adapter).collection("places");
    let err = places
        .find()
        .field("loc")
        .near(Near::at([0.0, 0.0]).max_distance(10.0))
        .fetch()
        .exec()
        .unwrap_err();
    assert!(matches!(err, QueryError::Unsupported(_)));
}

#[test]
fn fetch_results_populate_the_variant_cache() {
    use querylite::variants::{self, VariantKey};

    let adapter = Arc::new(MemoryAdapter::new());
    adapter.insert(
        "assets",
        doc! {
            "public_id": "banner",
            "resource_type": "image",
            "type": "upload",
            "format": "webp",
            "responsive_breakpoints": [
                { "transformation": "c_scale", "breakpoints": [
                    { "width": 1200, "height": 400, "bytes": 250_000 },
                    { "width": 600, "height": 200, "bytes": 80_000 },
                ]},
            ],
        },
    );
    let assets = Store::new(adapter).collection("assets");
    let docs = assets.find().fetch().exec().unwrap();
    assert_eq!(docs.len(), 1);

    let key = VariantKey {
        identifier: "banner".into(),
        kind: "image".into(),
        variant: "upload".into(),
        transformation: "c_scale".into(),
        format: "webp".into(),
    };
    let sizes = variants::lookup(&key).expect("variant cache populated by fetch");
    assert_eq!(sizes.len(), 2);
    assert_eq!(sizes[0].width, 1200);
    assert_eq!(sizes[1].bytes, 80_000);
}
