//! Fluent query construction and command compilation.
//!
//! A [`Query`] accumulates filter predicates, projections, sort/limit/skip
//! options, and update documents through chained calls, then compiles them
//! into one normalized command dispatched to the bound [`crate::Adapter`].
//! Chaining is purely synchronous; I/O happens exactly once, when the
//! [`Pending`] returned by a terminal call is consumed.

mod builder;
mod exec;
mod geo;
mod options;
mod select;
mod template;
mod update;
pub(crate) mod validate;

pub use builder::{Branches, Criteria, Query};
pub(crate) use builder::is_operator_document;
pub use exec::Pending;
pub use geo::{Circle, Geometry, Near, NearCenter};
pub use options::QueryOptions;
pub use select::{SelectArg, SliceArg, SortArg};
pub use template::QueryTemplate;
pub use update::compile_update;
