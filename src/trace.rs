//! Observability seam for dispatch. A hook is called right before a compiled
//! command is handed to the adapter and returns an observer that fires after
//! the adapter settles. Hooks can watch everything and change nothing.

use crate::errors::QueryError;
use bson::Document as BsonDocument;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// What the hook sees before dispatch.
#[derive(Debug, Clone)]
pub struct OpDescriptor {
    pub collection: String,
    pub operation: &'static str,
    pub conditions: BsonDocument,
    pub options: BsonDocument,
    pub document: Option<BsonDocument>,
    pub issued_at: DateTime<Utc>,
}

/// Completion observer: error slot (None on success) and elapsed wall time.
pub type TraceObserver = Box<dyn FnOnce(Option<&QueryError>, Duration) + Send>;

pub type TraceFn = Arc<dyn Fn(&'static str, &OpDescriptor) -> TraceObserver + Send + Sync>;

/// A ready-made hook that logs each dispatch through `log`.
#[must_use]
pub fn log_trace() -> TraceFn {
    Arc::new(|op, desc| {
        let collection = desc.collection.clone();
        log::debug!("dispatching {op} on {collection}: {:?}", desc.conditions);
        let observer: TraceObserver = Box::new(move |err, elapsed| match err {
            Some(e) => log::warn!("{op} on {collection} failed after {elapsed:?}: {e}"),
            None => log::debug!("{op} on {collection} settled in {elapsed:?}"),
        });
        observer
    })
}
