use crate::query::Query;
use crate::query::builder::merge_documents;
use bson::{Bson, Document as BsonDocument};

impl Query {
    /// Stage a partial update. Accepts flat field assignments, operator
    /// groups (`$set`, `$inc`, `$push`, ...), or a mix; repeated calls merge
    /// into the same pending document.
    #[must_use]
    pub fn update_doc(mut self, doc: BsonDocument) -> Self {
        merge_documents(&mut self.update, doc);
        self
    }
}

/// Normalize a pending update into operator form.
///
/// Every top-level key that is not operator-prefixed moves under one
/// synthesized `$set` group; an explicit `$set` merges into that same group
/// so exactly one ever exists. With `overwrite`, normalization is skipped and
/// the raw document is the full replacement, which is also the only way an
/// empty document means "clear the target" instead of a no-op.
#[must_use]
pub fn compile_update(raw: &BsonDocument, overwrite: bool) -> BsonDocument {
    if overwrite {
        return raw.clone();
    }
    let mut out = BsonDocument::new();
    let mut set_group = BsonDocument::new();
    for (key, value) in raw.clone() {
        let key_str: &str = key.as_ref();
        if !key_str.starts_with('$') {
            set_group.insert(key, value);
            continue;
        }
        if key_str == "$set" {
            if let Bson::Document(group) = value {
                for (k, v) in group {
                    set_group.insert(k, v);
                }
                continue;
            }
            // Malformed $set payload passes through untouched.
        }
        out.insert(key, value);
    }
    if !set_group.is_empty() {
        out.insert("$set", Bson::Document(set_group));
    }
    out
}
