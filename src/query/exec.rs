//! Terminal operations. Each one validates the accumulated state, compiles
//! exactly one command, and hands back a [`Pending`], the single "pending
//! operation" representation behind both completion styles. Dispatch happens
//! at most once, when the `Pending` is consumed; dropping it unexecuted
//! performs no I/O at all.

use crate::adapter::Adapter;
use crate::command::{FindAndModifyCommand, FindCommand, RemoveCommand, UpdateCommand};
use crate::config;
use crate::errors::QueryError;
use crate::query::Query;
use crate::query::update::compile_update;
use crate::query::validate;
use crate::trace::{OpDescriptor, TraceFn};
use crate::types::{Op, RemoveReport, UpdateReport};
use crate::variants;
use bson::{Bson, Document as BsonDocument};
use chrono::Utc;
use std::future::{IntoFuture, Ready, ready};
use std::sync::Arc;
use std::time::Instant;

type DispatchCall<T> = Box<dyn FnOnce(&dyn Adapter) -> Result<T, QueryError> + Send>;

enum PendingState<T> {
    Failed(QueryError),
    Ready(T),
    Dispatch {
        adapter: Arc<dyn Adapter>,
        trace: Option<TraceFn>,
        descriptor: OpDescriptor,
        call: DispatchCall<T>,
    },
}

/// A compiled command awaiting execution. Consume it with [`exec`]
/// (synchronous, the fire-and-forget path), [`exec_with`] (callback), or
/// `.await`; ownership guarantees the adapter is reached at most once no
/// matter which style the caller picks.
///
/// [`exec`]: Pending::exec
/// [`exec_with`]: Pending::exec_with
#[must_use = "a pending operation does nothing until exec()/exec_with()/.await consumes it"]
pub struct Pending<T> {
    state: PendingState<T>,
}

impl<T> Pending<T> {
    pub(crate) fn failed(err: QueryError) -> Self {
        Self { state: PendingState::Failed(err) }
    }

    pub(crate) fn ready(value: T) -> Self {
        Self { state: PendingState::Ready(value) }
    }

    fn dispatch(
        adapter: Arc<dyn Adapter>,
        trace: Option<TraceFn>,
        descriptor: OpDescriptor,
        call: DispatchCall<T>,
    ) -> Self {
        Self { state: PendingState::Dispatch { adapter, trace, descriptor, call } }
    }

    /// Compile-time errors surface here; otherwise the adapter is invoked
    /// exactly once and its result passed through unchanged.
    pub fn exec(self) -> Result<T, QueryError> {
        match self.state {
            PendingState::Failed(err) => Err(err),
            PendingState::Ready(value) => Ok(value),
            PendingState::Dispatch { adapter, trace, descriptor, call } => {
                let observer = trace.map(|hook| hook(descriptor.operation, &descriptor));
                let start = Instant::now();
                let result = call(adapter.as_ref());
                if let Some(observe) = observer {
                    observe(result.as_ref().err(), start.elapsed());
                }
                result
            }
        }
    }

    /// Callback completion. The callback always runs, including for
    /// zero-effect no-ops that never reach the adapter.
    pub fn exec_with<F: FnOnce(Result<T, QueryError>)>(self, callback: F) {
        callback(self.exec());
    }
}

impl<T> IntoFuture for Pending<T> {
    type Output = Result<T, QueryError>;
    type IntoFuture = Ready<Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        ready(self.exec())
    }
}

struct Prepared {
    adapter: Arc<dyn Adapter>,
    trace: Option<TraceFn>,
    query: Query,
}

impl Query {
    /// Latched chain errors first, then the authoritative option validation
    /// against the final operation, then adapter binding.
    fn prepare(mut self, op: Op, call: &'static str) -> Result<Prepared, QueryError> {
        if let Some(err) = self.latched.take() {
            return Err(err);
        }
        if self.pending_geo.is_some() {
            return Err(QueryError::state(call, "geo predicate begun but no shape supplied"));
        }
        self.op = op;
        validate::validate_options(op, &self)?;
        let adapter = self
            .adapter
            .take()
            .ok_or_else(|| QueryError::state(call, "no adapter bound to this query"))?;
        let trace = self.trace.take().or_else(config::default_trace);
        Ok(Prepared { adapter, trace, query: self })
    }

    fn find_command(&self) -> FindCommand {
        FindCommand {
            collection: self.collection.clone(),
            conditions: self.conditions.clone(),
            projection: none_if_empty(self.projection.clone()),
            sort: none_if_empty(self.options.sort.clone()),
            limit: self.options.limit,
            skip: self.options.skip,
            batch_size: self.options.batch_size,
            hint: self.options.hint.clone(),
            comment: self.options.comment.clone(),
            max_time_ms: self.options.max_time_ms,
            tailable: self.options.tailable,
            snapshot: self.options.snapshot,
            read_preference: self.options.read_preference,
        }
    }

    fn describe(
        &self,
        operation: &'static str,
        options: BsonDocument,
        document: Option<BsonDocument>,
    ) -> OpDescriptor {
        OpDescriptor {
            collection: self.collection.clone(),
            operation,
            conditions: self.conditions.clone(),
            options,
            document,
            issued_at: Utc::now(),
        }
    }

    // --- fetch family ----------------------------------------------------

    pub fn fetch(self) -> Pending<Vec<BsonDocument>> {
        let prepared = match self.prepare(Op::Find, "fetch") {
            Ok(p) => p,
            Err(e) => return Pending::failed(e),
        };
        let cmd = prepared.query.find_command();
        let descriptor = prepared.query.describe("find", cmd.options_document(), None);
        Pending::dispatch(
            prepared.adapter,
            prepared.trace,
            descriptor,
            Box::new(move |a| {
                let docs = a.find(&cmd)?;
                for doc in &docs {
                    variants::absorb(doc);
                }
                Ok(docs)
            }),
        )
    }

    pub fn fetch_one(self) -> Pending<Option<BsonDocument>> {
        let prepared = match self.prepare(Op::FindOne, "fetch_one") {
            Ok(p) => p,
            Err(e) => return Pending::failed(e),
        };
        let cmd = prepared.query.find_command();
        let descriptor = prepared.query.describe("findOne", cmd.options_document(), None);
        Pending::dispatch(
            prepared.adapter,
            prepared.trace,
            descriptor,
            Box::new(move |a| {
                let doc = a.find_one(&cmd)?;
                if let Some(doc) = &doc {
                    variants::absorb(doc);
                }
                Ok(doc)
            }),
        )
    }

    pub fn count(self) -> Pending<u64> {
        let prepared = match self.prepare(Op::Count, "count") {
            Ok(p) => p,
            Err(e) => return Pending::failed(e),
        };
        let cmd = prepared.query.find_command();
        let descriptor = prepared.query.describe("count", cmd.options_document(), None);
        Pending::dispatch(
            prepared.adapter,
            prepared.trace,
            descriptor,
            Box::new(move |a| a.count(&cmd)),
        )
    }

    /// Distinct values of one field. Incompatible with projections and with
    /// a staged update document.
    pub fn distinct(self, field: impl Into<String>) -> Pending<Vec<Bson>> {
        let mut prepared = match self.prepare(Op::Distinct, "distinct") {
            Ok(p) => p,
            Err(e) => return Pending::failed(e),
        };
        if !prepared.query.update.is_empty() {
            return Pending::failed(QueryError::state(
                "distinct",
                "distinct cannot carry an update document",
            ));
        }
        let field = field.into();
        prepared.query.distinct_field = Some(field.clone());
        let cmd = prepared.query.find_command();
        let descriptor = prepared.query.describe("distinct", cmd.options_document(), None);
        Pending::dispatch(
            prepared.adapter,
            prepared.trace,
            descriptor,
            Box::new(move |a| a.distinct(&field, &cmd)),
        )
    }

    // --- update family ---------------------------------------------------

    pub fn update(self) -> Pending<UpdateReport> {
        self.update_terminal(Op::Update, "update")
    }

    pub fn update_one(self) -> Pending<UpdateReport> {
        self.update_terminal(Op::UpdateOne, "update_one")
    }

    pub fn update_many(self) -> Pending<UpdateReport> {
        self.update_terminal(Op::UpdateMany, "update_many")
    }

    fn update_terminal(self, op: Op, call: &'static str) -> Pending<UpdateReport> {
        let prepared = match self.prepare(op, call) {
            Ok(p) => p,
            Err(e) => return Pending::failed(e),
        };
        let q = &prepared.query;
        let overwrite = q.options.overwrite;
        let compiled = compile_update(&q.update, overwrite);
        if compiled.is_empty() && !overwrite {
            // Nothing to apply and no intent to clear: settle without I/O.
            log::debug!("empty update for {} resolved as a no-op", q.collection);
            return Pending::ready(UpdateReport::default());
        }
        let multi = match op {
            Op::UpdateMany => true,
            Op::UpdateOne => false,
            _ => q.options.multi,
        };
        let cmd = UpdateCommand {
            collection: q.collection.clone(),
            conditions: q.conditions.clone(),
            document: compiled,
            multi,
            upsert: q.options.upsert,
            overwrite,
        };
        let descriptor = q.describe(op.name(), cmd.options_document(), Some(cmd.document.clone()));
        Pending::dispatch(
            prepared.adapter,
            prepared.trace,
            descriptor,
            Box::new(move |a| a.update(&cmd)),
        )
    }

    /// Full-document replacement; the document may not contain update
    /// operators.
    pub fn replace_one(self, replacement: BsonDocument) -> Pending<UpdateReport> {
        let prepared = match self.prepare(Op::ReplaceOne, "replace_one") {
            Ok(p) => p,
            Err(e) => return Pending::failed(e),
        };
        if replacement.keys().any(|k| {
            let k: &str = k.as_ref();
            k.starts_with('$')
        }) {
            return Pending::failed(QueryError::argument(
                "replace_one",
                "a replacement document may not contain update operators",
            ));
        }
        let q = &prepared.query;
        let cmd = UpdateCommand {
            collection: q.collection.clone(),
            conditions: q.conditions.clone(),
            document: replacement,
            multi: false,
            upsert: q.options.upsert,
            overwrite: true,
        };
        let descriptor =
            q.describe("replaceOne", cmd.options_document(), Some(cmd.document.clone()));
        Pending::dispatch(
            prepared.adapter,
            prepared.trace,
            descriptor,
            Box::new(move |a| a.update(&cmd)),
        )
    }

    // --- remove family ---------------------------------------------------

    pub fn remove(self) -> Pending<RemoveReport> {
        self.remove_terminal(Op::Remove, "remove", false)
    }

    pub fn delete_one(self) -> Pending<RemoveReport> {
        self.remove_terminal(Op::DeleteOne, "delete_one", true)
    }

    pub fn delete_many(self) -> Pending<RemoveReport> {
        self.remove_terminal(Op::DeleteMany, "delete_many", false)
    }

    fn remove_terminal(self, op: Op, call: &'static str, single: bool) -> Pending<RemoveReport> {
        let prepared = match self.prepare(op, call) {
            Ok(p) => p,
            Err(e) => return Pending::failed(e),
        };
        let q = &prepared.query;
        let cmd = RemoveCommand {
            collection: q.collection.clone(),
            conditions: q.conditions.clone(),
            single,
        };
        let descriptor = q.describe(op.name(), BsonDocument::new(), None);
        Pending::dispatch(
            prepared.adapter,
            prepared.trace,
            descriptor,
            Box::new(move |a| a.remove(&cmd)),
        )
    }

    // --- findAndModify family --------------------------------------------

    /// Atomically update one document and return it. Defaults to returning
    /// the modified document (`new = true`) without upserting.
    pub fn find_one_and_update(self, update: BsonDocument) -> Pending<Option<BsonDocument>> {
        let staged = self.update_doc(update);
        let prepared = match staged.prepare(Op::FindOneAndUpdate, "find_one_and_update") {
            Ok(p) => p,
            Err(e) => return Pending::failed(e),
        };
        let q = &prepared.query;
        let overwrite = q.options.overwrite;
        let compiled = compile_update(&q.update, overwrite);
        if compiled.is_empty() && !overwrite {
            log::debug!("empty update for {} resolved as a no-op", q.collection);
            return Pending::ready(None);
        }
        let cmd = FindAndModifyCommand {
            collection: q.collection.clone(),
            conditions: q.conditions.clone(),
            update: Some(compiled),
            return_new: q.options.return_new.unwrap_or(true),
            upsert: q.options.upsert,
            sort: none_if_empty(q.options.sort.clone()),
            fields: none_if_empty(q.projection.clone()),
        };
        let descriptor =
            q.describe("findOneAndUpdate", cmd.options_document(), cmd.update.clone());
        Pending::dispatch(
            prepared.adapter,
            prepared.trace,
            descriptor,
            Box::new(move |a| {
                let doc = a.find_and_modify(&cmd)?;
                if let Some(doc) = &doc {
                    variants::absorb(doc);
                }
                Ok(doc)
            }),
        )
    }

    /// Atomically remove one document and return it.
    pub fn find_one_and_remove(self) -> Pending<Option<BsonDocument>> {
        let prepared = match self.prepare(Op::FindOneAndRemove, "find_one_and_remove") {
            Ok(p) => p,
            Err(e) => return Pending::failed(e),
        };
        let q = &prepared.query;
        let cmd = FindAndModifyCommand {
            collection: q.collection.clone(),
            conditions: q.conditions.clone(),
            update: None,
            return_new: false,
            upsert: false,
            sort: none_if_empty(q.options.sort.clone()),
            fields: none_if_empty(q.projection.clone()),
        };
        let descriptor = q.describe("findOneAndRemove", cmd.options_document(), None);
        Pending::dispatch(
            prepared.adapter,
            prepared.trace,
            descriptor,
            Box::new(move |a| a.find_and_modify(&cmd)),
        )
    }
}

fn none_if_empty(doc: BsonDocument) -> Option<BsonDocument> {
    if doc.is_empty() { None } else { Some(doc) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_and_failed_short_circuit() {
        let ok: Pending<u64> = Pending::ready(7);
        assert_eq!(ok.exec().unwrap(), 7);

        let err: Pending<u64> = Pending::failed(QueryError::state("fetch", "no adapter"));
        assert!(matches!(err.exec(), Err(QueryError::State { .. })));
    }

    #[test]
    fn unbound_query_fails_before_io() {
        let pending = Query::new("users").filter("a", 1).fetch();
        match pending.exec() {
            Err(QueryError::State { call, .. }) => assert_eq!(call, "fetch"),
            other => panic!("expected state error, got {other:?}"),
        }
    }

    #[test]
    fn callback_runs_for_no_op_updates() {
        // Resolved pendings still invoke the completion callback.
        let mut saw = false;
        Pending::ready(UpdateReport::default()).exec_with(|r| {
            saw = true;
            assert_eq!(r.unwrap(), UpdateReport::default());
        });
        assert!(saw);
    }
}
