use bson::{Bson, Document as BsonDocument};
use proptest::prelude::*;
use querylite::query::compile_update;

fn arb_value() -> impl Strategy<Value = Bson> {
    prop_oneof![
        any::<i32>().prop_map(Bson::Int32),
        any::<bool>().prop_map(Bson::Boolean),
        "[a-z]{0,12}".prop_map(Bson::String),
    ]
}

fn arb_flat_doc() -> impl Strategy<Value = BsonDocument> {
    proptest::collection::btree_map("[a-z]{1,8}", arb_value(), 0..8).prop_map(|entries| {
        let mut doc = BsonDocument::new();
        for (k, v) in entries {
            doc.insert(k, v);
        }
        doc
    })
}

proptest! {
    #[test]
    fn flat_documents_land_under_one_set_group(raw in arb_flat_doc()) {
        let compiled = compile_update(&raw, false);
        if raw.is_empty() {
            prop_assert!(compiled.is_empty());
        } else {
            prop_assert_eq!(compiled.keys().count(), 1);
            let set = compiled.get_document("$set").unwrap();
            prop_assert_eq!(set, &raw);
        }
    }

    #[test]
    fn compilation_is_idempotent(raw in arb_flat_doc()) {
        let once = compile_update(&raw, false);
        let twice = compile_update(&once, false);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn overwrite_is_verbatim(raw in arb_flat_doc()) {
        prop_assert_eq!(compile_update(&raw, true), raw);
    }
}
