use crate::adapter::Adapter;
use crate::errors::QueryError;
use crate::query::geo::PendingGeo;
use crate::query::options::QueryOptions;
use crate::types::{MAX_IN_SET, Op};
use bson::{Bson, Document as BsonDocument};
use std::fmt;
use std::sync::Arc;

use crate::trace::TraceFn;

/// Criteria that can be merged into a builder: either a raw condition
/// document or another builder whose committed state is folded in wholesale.
#[derive(Clone)]
pub enum Criteria {
    Raw(BsonDocument),
    Builder(Box<Query>),
}

impl From<BsonDocument> for Criteria {
    fn from(doc: BsonDocument) -> Self {
        Self::Raw(doc)
    }
}

impl From<Query> for Criteria {
    fn from(q: Query) -> Self {
        Self::Builder(Box::new(q))
    }
}

/// Branch list for the logical combinators. A single criteria auto-wraps
/// into a one-element list.
pub struct Branches(pub Vec<BsonDocument>);

impl From<BsonDocument> for Branches {
    fn from(doc: BsonDocument) -> Self {
        Self(vec![doc])
    }
}

impl From<Vec<BsonDocument>> for Branches {
    fn from(docs: Vec<BsonDocument>) -> Self {
        Self(docs)
    }
}

impl From<Query> for Branches {
    fn from(q: Query) -> Self {
        Self(vec![q.conditions])
    }
}

impl From<Criteria> for Branches {
    fn from(c: Criteria) -> Self {
        match c {
            Criteria::Raw(doc) => Self(vec![doc]),
            Criteria::Builder(q) => Self(vec![q.conditions]),
        }
    }
}

impl From<Vec<Criteria>> for Branches {
    fn from(cs: Vec<Criteria>) -> Self {
        Self(
            cs.into_iter()
                .map(|c| match c {
                    Criteria::Raw(doc) => doc,
                    Criteria::Builder(q) => q.conditions,
                })
                .collect(),
        )
    }
}

/// A fluent query builder bound to one collection.
///
/// Chain methods take and return the builder by value; misuse (an operator
/// with no selected field path, mixed sort syntaxes, an option the declared
/// operation forbids) latches the first error, which surfaces from the
/// terminal call before any adapter I/O.
#[derive(Clone)]
pub struct Query {
    pub(crate) collection: String,
    pub(crate) op: Op,
    pub(crate) conditions: BsonDocument,
    pub(crate) projection: BsonDocument,
    pub(crate) update: BsonDocument,
    pub(crate) options: QueryOptions,
    pub(crate) current_path: Option<String>,
    pub(crate) distinct_field: Option<String>,
    pub(crate) pending_geo: Option<PendingGeo>,
    pub(crate) adapter: Option<Arc<dyn Adapter>>,
    pub(crate) trace: Option<TraceFn>,
    pub(crate) latched: Option<QueryError>,
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("collection", &self.collection)
            .field("op", &self.op)
            .field("conditions", &self.conditions)
            .field("projection", &self.projection)
            .field("update", &self.update)
            .field("options", &self.options)
            .field("current_path", &self.current_path)
            .field("distinct_field", &self.distinct_field)
            .field("latched", &self.latched)
            .finish_non_exhaustive()
    }
}

impl Query {
    /// A builder with no adapter bound. Useful for composing criteria that
    /// will be merged elsewhere; dispatching it is a state error.
    #[must_use]
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            op: Op::None,
            conditions: BsonDocument::new(),
            projection: BsonDocument::new(),
            update: BsonDocument::new(),
            options: QueryOptions::default(),
            current_path: None,
            distinct_field: None,
            pending_geo: None,
            adapter: None,
            trace: None,
            latched: None,
        }
    }

    pub(crate) fn bound(
        collection: &str,
        adapter: Arc<dyn Adapter>,
        trace: Option<TraceFn>,
        op: Op,
    ) -> Self {
        let mut q = Self::new(collection);
        q.adapter = Some(adapter);
        q.trace = trace;
        q.op = op;
        q
    }

    // --- accessors -------------------------------------------------------

    #[must_use]
    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    #[must_use]
    pub const fn operation(&self) -> Op {
        self.op
    }

    #[must_use]
    pub const fn conditions(&self) -> &BsonDocument {
        &self.conditions
    }

    #[must_use]
    pub const fn projection(&self) -> &BsonDocument {
        &self.projection
    }

    #[must_use]
    pub const fn pending_update(&self) -> &BsonDocument {
        &self.update
    }

    #[must_use]
    pub const fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// The first chain-call error, if any. Surfaced by the terminal call.
    #[must_use]
    pub const fn chain_error(&self) -> Option<&QueryError> {
        self.latched.as_ref()
    }

    /// Bind (or rebind) the storage adapter this builder dispatches to.
    #[must_use]
    pub fn adapter(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Instance-level trace hook; overrides the process-wide default.
    #[must_use]
    pub fn trace(mut self, hook: TraceFn) -> Self {
        self.trace = Some(hook);
        self
    }

    pub(crate) fn latch(mut self, err: QueryError) -> Self {
        if self.latched.is_none() {
            log::debug!("query on {} latched: {err}", self.collection);
            self.latched = Some(err);
        }
        self
    }

    // --- condition accumulator -------------------------------------------

    /// Select the field path subsequent path-relative operators apply to.
    #[must_use]
    pub fn field(mut self, path: impl Into<String>) -> Self {
        self.current_path = Some(path.into());
        self
    }

    /// Scalar equality at the currently selected path.
    /// `field(p).equals(v)` and `filter(p, v)` compile identically.
    #[must_use]
    pub fn equals(self, value: impl Into<Bson>) -> Self {
        let Some(path) = self.current_path.clone() else {
            return self.latch(QueryError::state("equals", "no field path selected; call field() first"));
        };
        self.set_scalar(&path, value.into(), "equals")
    }

    /// Two-argument equality form.
    #[must_use]
    pub fn filter(self, path: impl Into<String>, value: impl Into<Bson>) -> Self {
        let path = path.into();
        self.field(path.clone()).set_scalar(&path, value.into(), "filter")
    }

    fn set_scalar(mut self, path: &str, value: Bson, call: &'static str) -> Self {
        if let Some(Bson::Document(existing)) = self.conditions.get(path)
            && is_operator_document(existing)
        {
            return self.latch(QueryError::state(
                call,
                format!("`{path}` already holds an operator predicate; a scalar equality would conflict"),
            ));
        }
        self.conditions.insert(path, value);
        self
    }

    /// Merge `key: value` into the operator document at the current path,
    /// creating it when absent. A scalar equality already at the path is a
    /// representation conflict and latches a state error.
    pub(crate) fn apply_operator(mut self, call: &'static str, key: &str, value: Bson) -> Self {
        let Some(path) = self.current_path.clone() else {
            return self.latch(QueryError::state(
                call,
                "no field path selected; call field() first or pass an explicit path",
            ));
        };
        match self.conditions.remove(&path) {
            None => {
                let mut entry = BsonDocument::new();
                entry.insert(key, value);
                self.conditions.insert(path, entry);
            }
            Some(Bson::Document(mut entry)) if entry.is_empty() || is_operator_document(&entry) => {
                entry.insert(key, value);
                self.conditions.insert(path, entry);
            }
            Some(previous) => {
                self.conditions.insert(path.clone(), previous);
                return self.latch(QueryError::state(
                    call,
                    format!("`{path}` already holds a scalar equality; an operator predicate would conflict"),
                ));
            }
        }
        self
    }

    #[must_use]
    pub fn gt(self, value: impl Into<Bson>) -> Self {
        self.apply_operator("gt", "$gt", value.into())
    }

    #[must_use]
    pub fn gte(self, value: impl Into<Bson>) -> Self {
        self.apply_operator("gte", "$gte", value.into())
    }

    #[must_use]
    pub fn lt(self, value: impl Into<Bson>) -> Self {
        self.apply_operator("lt", "$lt", value.into())
    }

    #[must_use]
    pub fn lte(self, value: impl Into<Bson>) -> Self {
        self.apply_operator("lte", "$lte", value.into())
    }

    #[must_use]
    pub fn ne(self, value: impl Into<Bson>) -> Self {
        self.apply_operator("ne", "$ne", value.into())
    }

    #[must_use]
    pub fn in_(self, values: Vec<Bson>) -> Self {
        if values.len() > MAX_IN_SET {
            log::warn!("$in set truncated to {MAX_IN_SET} entries");
        }
        let values: Vec<Bson> = values.into_iter().take(MAX_IN_SET).collect();
        self.apply_operator("in_", "$in", Bson::Array(values))
    }

    #[must_use]
    pub fn nin(self, values: Vec<Bson>) -> Self {
        let values: Vec<Bson> = values.into_iter().take(MAX_IN_SET).collect();
        self.apply_operator("nin", "$nin", Bson::Array(values))
    }

    #[must_use]
    pub fn all(self, values: Vec<Bson>) -> Self {
        self.apply_operator("all", "$all", Bson::Array(values))
    }

    #[must_use]
    pub fn size(self, n: i64) -> Self {
        self.apply_operator("size", "$size", Bson::Int64(n))
    }

    #[must_use]
    pub fn exists(self, yes: bool) -> Self {
        self.apply_operator("exists", "$exists", Bson::Boolean(yes))
    }

    /// Pattern predicate. Compiles to `$regex`; evaluation is the adapter's
    /// concern (the memory adapter needs the `regex` feature for it).
    #[must_use]
    pub fn regex(self, pattern: impl Into<String>) -> Self {
        self.apply_operator("regex", "$regex", Bson::String(pattern.into()))
    }

    #[must_use]
    pub fn modulo(self, divisor: i64, remainder: i64) -> Self {
        self.apply_operator(
            "modulo",
            "$mod",
            Bson::Array(vec![Bson::Int64(divisor), Bson::Int64(remainder)]),
        )
    }

    /// Array-element predicate: at least one element of the array at the
    /// current path matches the given criteria.
    #[must_use]
    pub fn elem_match(self, criteria: impl Into<Criteria>) -> Self {
        let inner = match criteria.into() {
            Criteria::Raw(doc) => doc,
            Criteria::Builder(q) => {
                if let Some(err) = q.latched {
                    return self.latch(err);
                }
                q.conditions
            }
        };
        self.apply_operator("elem_match", "$elemMatch", Bson::Document(inner))
    }

    // --- logical combinators ---------------------------------------------

    #[must_use]
    pub fn or(self, branches: impl Into<Branches>) -> Self {
        self.push_logical("or", "$or", branches.into())
    }

    #[must_use]
    pub fn nor(self, branches: impl Into<Branches>) -> Self {
        self.push_logical("nor", "$nor", branches.into())
    }

    #[must_use]
    pub fn and(self, branches: impl Into<Branches>) -> Self {
        self.push_logical("and", "$and", branches.into())
    }

    fn push_logical(mut self, call: &'static str, key: &str, branches: Branches) -> Self {
        let mut list = match self.conditions.remove(key) {
            Some(Bson::Array(existing)) => existing,
            None => Vec::new(),
            Some(other) => {
                self.conditions.insert(key, other);
                return self.latch(QueryError::state(
                    call,
                    format!("`{key}` already holds a non-array value"),
                ));
            }
        };
        list.extend(branches.0.into_iter().map(Bson::Document));
        self.conditions.insert(key, Bson::Array(list));
        self
    }

    // --- composition -----------------------------------------------------

    /// Deep-merge another builder's (or a raw document's) state into this
    /// one. Raw criteria touch conditions only; a builder also contributes
    /// its projection, pending update, and options.
    #[must_use]
    pub fn merge(mut self, other: impl Into<Criteria>) -> Self {
        match other.into() {
            Criteria::Raw(doc) => {
                merge_documents(&mut self.conditions, doc);
            }
            Criteria::Builder(q) => {
                let q = *q;
                if let Some(err) = q.latched {
                    return self.latch(err);
                }
                merge_documents(&mut self.conditions, q.conditions);
                merge_documents(&mut self.projection, q.projection);
                merge_documents(&mut self.update, q.update);
                if let Err(err) = self.options.absorb(q.options) {
                    return self.latch(err);
                }
                if self.distinct_field.is_none() {
                    self.distinct_field = q.distinct_field;
                }
            }
        }
        self
    }
}

/// A nested document whose first key is `$`-prefixed is an operator
/// predicate; anything else is a plain value compared by equality.
pub(crate) fn is_operator_document(doc: &BsonDocument) -> bool {
    doc.iter().next().is_some_and(|(k, _)| {
        let k: &str = k.as_ref();
        k.starts_with('$')
    })
}

/// Recursive merge: nested documents merge key-wise, everything else is
/// overwritten by the incoming side.
pub(crate) fn merge_documents(dst: &mut BsonDocument, src: BsonDocument) {
    for (k, v) in src {
        match (dst.get_mut(&k), v) {
            (Some(Bson::Document(d)), Bson::Document(s)) => merge_documents(d, s),
            (_, v) => {
                dst.insert(k, v);
            }
        }
    }
}
