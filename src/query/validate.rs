//! Permission matrix restricting option/helper use per command kind.
//!
//! Guarded helpers consult the table as soon as the operation is declared;
//! the authoritative pass re-runs at terminal time over the accumulated
//! option set, so the same misuse yields the same error whichever side of
//! the terminal call it lands on.

use crate::errors::QueryError;
use crate::query::Query;
use crate::types::Op;
use bson::Bson;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Helper {
    Select,
    Slice,
    Sort,
    Limit,
    Skip,
    BatchSize,
    Hint,
    Tailable,
    Snapshot,
}

impl Helper {
    pub(crate) const fn name(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Slice => "slice",
            Self::Sort => "sort",
            Self::Limit => "limit",
            Self::Skip => "skip",
            Self::BatchSize => "batchSize",
            Self::Hint => "hint",
            Self::Tailable => "tailable",
            Self::Snapshot => "snapshot",
        }
    }
}

pub(crate) const fn allowed(op: Op, helper: Helper) -> bool {
    match op {
        // Not yet declared: permissive here, authoritative at terminal time.
        Op::None | Op::Find | Op::FindOne => true,
        Op::Count => matches!(helper, Helper::Hint),
        Op::Distinct => false,
        Op::Update
        | Op::UpdateMany
        | Op::UpdateOne
        | Op::ReplaceOne
        | Op::Remove
        | Op::DeleteOne
        | Op::DeleteMany => matches!(helper, Helper::Hint),
        Op::FindOneAndUpdate | Op::FindOneAndRemove => {
            matches!(helper, Helper::Sort | Helper::Select | Helper::Slice | Helper::Hint)
        }
    }
}

pub(crate) fn check(op: Op, helper: Helper) -> Result<(), QueryError> {
    if allowed(op, helper) {
        Ok(())
    } else {
        Err(QueryError::Validation { helper: helper.name(), operation: op.name() })
    }
}

/// Terminal-time pass over everything the builder accumulated.
pub(crate) fn validate_options(op: Op, q: &Query) -> Result<(), QueryError> {
    for (_, entry) in q.projection.iter() {
        let helper = match entry {
            Bson::Document(d) if d.get("$slice").is_some() => Helper::Slice,
            _ => Helper::Select,
        };
        check(op, helper)?;
    }
    if !q.options.sort.is_empty() {
        check(op, Helper::Sort)?;
    }
    if q.options.limit.is_some() {
        check(op, Helper::Limit)?;
    }
    if q.options.skip.is_some() {
        check(op, Helper::Skip)?;
    }
    if q.options.batch_size.is_some() {
        check(op, Helper::BatchSize)?;
    }
    if q.options.hint.is_some() {
        check(op, Helper::Hint)?;
    }
    if q.options.tailable {
        check(op, Helper::Tailable)?;
    }
    if q.options.snapshot {
        check(op, Helper::Snapshot)?;
    }
    Ok(())
}
