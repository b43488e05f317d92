use crate::adapter::Adapter;
use crate::query::options::QueryOptions;
use crate::query::{Criteria, Query};
use crate::trace::TraceFn;
use bson::Document as BsonDocument;
use std::sync::Arc;

/// A reusable factory seeded from a configured builder's committed state.
///
/// Only fully-committed state is captured: conditions, projection, pending
/// update, options, and the collection/adapter/trace bindings. The declared
/// operation, the current chain path, and any half-built geo predicate never
/// leak into a template, and every minted builder gets its own deep clone, so
/// mutating an instance cannot bleed back.
#[derive(Clone)]
pub struct QueryTemplate {
    collection: String,
    adapter: Option<Arc<dyn Adapter>>,
    trace: Option<TraceFn>,
    conditions: BsonDocument,
    projection: BsonDocument,
    update: BsonDocument,
    options: QueryOptions,
}

impl Query {
    /// Snapshot this builder's committed state into a reusable template.
    #[must_use]
    pub fn to_template(&self) -> QueryTemplate {
        QueryTemplate {
            collection: self.collection.clone(),
            adapter: self.adapter.clone(),
            trace: self.trace.clone(),
            conditions: self.conditions.clone(),
            projection: self.projection.clone(),
            update: self.update.clone(),
            options: self.options.clone(),
        }
    }
}

impl QueryTemplate {
    /// A fresh builder pre-seeded with the captured state.
    #[must_use]
    pub fn query(&self) -> Query {
        let mut q = Query::new(self.collection.clone());
        q.adapter = self.adapter.clone();
        q.trace = self.trace.clone();
        q.conditions = self.conditions.clone();
        q.projection = self.projection.clone();
        q.update = self.update.clone();
        q.options = self.options.clone();
        q
    }

    /// A fresh builder with extra criteria (and optionally an option bag)
    /// merged over the captured state.
    #[must_use]
    pub fn query_with(
        &self,
        criteria: impl Into<Criteria>,
        options: Option<BsonDocument>,
    ) -> Query {
        let mut q = self.query().merge(criteria);
        if let Some(opts) = options {
            q = q.apply_options(opts);
        }
        q
    }
}
