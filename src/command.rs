//! Compiled command shapes. A builder's terminal call normalizes all
//! accumulated state into exactly one of these before anything reaches an
//! adapter; adapters never see builder internals.

use crate::types::ReadPreference;
use bson::{Bson, Document as BsonDocument};

#[derive(Debug, Clone, Default)]
pub struct FindCommand {
    pub collection: String,
    pub conditions: BsonDocument,
    pub projection: Option<BsonDocument>,
    pub sort: Option<BsonDocument>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
    pub batch_size: Option<u32>,
    pub hint: Option<BsonDocument>,
    pub comment: Option<String>,
    pub max_time_ms: Option<u64>,
    pub tailable: bool,
    pub snapshot: bool,
    pub read_preference: Option<ReadPreference>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCommand {
    pub collection: String,
    pub conditions: BsonDocument,
    pub document: BsonDocument,
    pub multi: bool,
    pub upsert: bool,
    pub overwrite: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RemoveCommand {
    pub collection: String,
    pub conditions: BsonDocument,
    pub single: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FindAndModifyCommand {
    pub collection: String,
    pub conditions: BsonDocument,
    /// `None` means remove-and-return.
    pub update: Option<BsonDocument>,
    pub return_new: bool,
    pub upsert: bool,
    pub sort: Option<BsonDocument>,
    pub fields: Option<BsonDocument>,
}

impl FindCommand {
    /// Option document handed to trace hooks; keys mirror the wire names.
    #[must_use]
    pub fn options_document(&self) -> BsonDocument {
        let mut out = BsonDocument::new();
        if let Some(sort) = &self.sort {
            out.insert("sort", sort.clone());
        }
        if let Some(projection) = &self.projection {
            out.insert("fields", projection.clone());
        }
        if let Some(limit) = self.limit {
            out.insert("limit", limit);
        }
        if let Some(skip) = self.skip {
            out.insert("skip", Bson::Int64(skip as i64));
        }
        if let Some(batch) = self.batch_size {
            out.insert("batchSize", Bson::Int64(i64::from(batch)));
        }
        if let Some(hint) = &self.hint {
            out.insert("hint", hint.clone());
        }
        if let Some(comment) = &self.comment {
            out.insert("comment", comment.clone());
        }
        if let Some(ms) = self.max_time_ms {
            out.insert("maxTimeMS", Bson::Int64(ms as i64));
        }
        if self.tailable {
            out.insert("tailable", true);
        }
        if self.snapshot {
            out.insert("snapshot", true);
        }
        if let Some(rp) = self.read_preference {
            out.insert("readPreference", rp.as_str());
        }
        out
    }
}

impl UpdateCommand {
    #[must_use]
    pub fn options_document(&self) -> BsonDocument {
        let mut out = BsonDocument::new();
        if self.multi {
            out.insert("multi", true);
        }
        if self.upsert {
            out.insert("upsert", true);
        }
        if self.overwrite {
            out.insert("overwrite", true);
        }
        out
    }
}

impl FindAndModifyCommand {
    #[must_use]
    pub fn options_document(&self) -> BsonDocument {
        let mut out = BsonDocument::new();
        out.insert("new", self.return_new);
        out.insert("upsert", self.upsert);
        if let Some(sort) = &self.sort {
            out.insert("sort", sort.clone());
        }
        if let Some(fields) = &self.fields {
            out.insert("fields", fields.clone());
        }
        out
    }
}
