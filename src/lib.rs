//! querylite: fluent query construction and command compilation for
//! document stores.
//!
//! A [`Query`] accumulates predicates, projections, sort/limit/skip options,
//! and update documents through chained calls, then compiles everything into
//! one normalized command dispatched to a pluggable [`Adapter`]. Chaining is
//! synchronous and I/O happens exactly once, when the [`query::Pending`]
//! returned by a terminal call is consumed: by `exec()`, by callback, or by
//! `.await`.
//!
//! ```
//! use querylite::{Store, adapter::memory::MemoryAdapter};
//! use bson::doc;
//! use std::sync::Arc;
//!
//! let adapter = Arc::new(MemoryAdapter::new());
//! adapter.insert("users", doc! { "name": "alice", "age": 30_i32 });
//! adapter.insert("users", doc! { "name": "bob", "age": 55_i32 });
//!
//! let users = Store::new(adapter).collection("users");
//! let found = users
//!     .find()
//!     .field("age").gte(21).lte(65)
//!     .sort("-age")
//!     .limit(10)
//!     .fetch()
//!     .exec()
//!     .unwrap();
//! assert_eq!(found.len(), 2);
//! ```

pub mod adapter;
pub mod command;
pub mod config;
pub mod errors;
pub mod logger;
pub mod query;
pub mod trace;
pub mod types;
pub mod variants;

/// Cargo features this build was compiled with, for startup logging.
pub mod features {
    include!(concat!(env!("OUT_DIR"), "/compiled_features.rs"));
}

pub use adapter::Adapter;
pub use errors::QueryError;
pub use query::{Branches, Criteria, Pending, Query, QueryTemplate};
pub use types::{Op, ReadPreference, RemoveReport, UpdateReport};

use crate::trace::TraceFn;
use std::sync::Arc;

/// Entry point binding an adapter to named collections.
pub struct Store {
    adapter: Arc<dyn Adapter>,
}

impl Store {
    #[must_use]
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self { adapter }
    }

    #[must_use]
    pub fn collection(&self, name: impl Into<String>) -> Collection {
        Collection { name: name.into(), adapter: self.adapter.clone(), trace: None }
    }
}

/// A named collection handle; mints builders bound to its adapter.
#[derive(Clone)]
pub struct Collection {
    name: String,
    adapter: Arc<dyn Adapter>,
    trace: Option<TraceFn>,
}

impl Collection {
    #[must_use]
    pub fn new(name: impl Into<String>, adapter: Arc<dyn Adapter>) -> Self {
        Self { name: name.into(), adapter, trace: None }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trace hook inherited by every builder this collection mints;
    /// overrides the process-wide default.
    pub fn set_trace(&mut self, hook: Option<TraceFn>) {
        self.trace = hook;
    }

    /// A builder with no operation declared yet; the terminal call decides.
    #[must_use]
    pub fn query(&self) -> Query {
        Query::bound(&self.name, self.adapter.clone(), self.trace.clone(), Op::None)
    }

    /// A builder already declared as a fetch, so option misuse is caught at
    /// the offending chain call instead of at terminal time.
    #[must_use]
    pub fn find(&self) -> Query {
        Query::bound(&self.name, self.adapter.clone(), self.trace.clone(), Op::Find)
    }

    /// A builder already declared as an update.
    #[must_use]
    pub fn update(&self) -> Query {
        Query::bound(&self.name, self.adapter.clone(), self.trace.clone(), Op::Update)
    }

    /// A builder already declared as a remove.
    #[must_use]
    pub fn remove(&self) -> Query {
        Query::bound(&self.name, self.adapter.clone(), self.trace.clone(), Op::Remove)
    }
}
