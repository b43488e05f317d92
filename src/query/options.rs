use crate::errors::QueryError;
use crate::query::Query;
use crate::query::select::{SelectArg, SortArg};
use crate::query::validate::{self, Helper};
use crate::types::ReadPreference;
use bson::{Bson, Document as BsonDocument};

/// Which syntax recorded the sort so far. Pair-list and map/string forms are
/// mutually exclusive for the lifetime of a builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SortForm {
    Pairs,
    Map,
}

/// Every execution knob a builder recognizes, one field per option. Bulk
/// application goes through [`Query::apply_options`], which matches over
/// recognized keys so the legal set stays statically enumerable.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub sort: BsonDocument,
    pub(crate) sort_form: Option<SortForm>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
    pub batch_size: Option<u32>,
    pub hint: Option<BsonDocument>,
    pub comment: Option<String>,
    pub max_time_ms: Option<u64>,
    pub tailable: bool,
    pub snapshot: bool,
    pub read_preference: Option<ReadPreference>,
    pub overwrite: bool,
    pub upsert: bool,
    /// `None` means "operation default": findAndModify returns the modified
    /// document unless told otherwise.
    pub return_new: Option<bool>,
    pub multi: bool,
}

impl QueryOptions {
    /// Fold another option set into this one. Incoming values win; sort
    /// entries accumulate and mixing syntaxes is rejected exactly as it is
    /// for repeated `sort()` calls.
    pub(crate) fn absorb(&mut self, other: Self) -> Result<(), QueryError> {
        if !other.sort.is_empty() {
            if let (Some(a), Some(b)) = (self.sort_form, other.sort_form)
                && a != b
            {
                return Err(QueryError::state("sort", "can't mix sort syntaxes"));
            }
            for (k, v) in other.sort {
                self.sort.insert(k, v);
            }
            if self.sort_form.is_none() {
                self.sort_form = other.sort_form;
            }
        }
        if other.limit.is_some() {
            self.limit = other.limit;
        }
        if other.skip.is_some() {
            self.skip = other.skip;
        }
        if other.batch_size.is_some() {
            self.batch_size = other.batch_size;
        }
        if other.hint.is_some() {
            self.hint = other.hint;
        }
        if other.comment.is_some() {
            self.comment = other.comment;
        }
        if other.max_time_ms.is_some() {
            self.max_time_ms = other.max_time_ms;
        }
        if other.read_preference.is_some() {
            self.read_preference = other.read_preference;
        }
        if other.return_new.is_some() {
            self.return_new = other.return_new;
        }
        self.tailable |= other.tailable;
        self.snapshot |= other.snapshot;
        self.overwrite |= other.overwrite;
        self.upsert |= other.upsert;
        self.multi |= other.multi;
        Ok(())
    }
}

impl Query {
    fn guarded(self, helper: Helper) -> Result<Self, Self> {
        match validate::check(self.op, helper) {
            Ok(()) => Ok(self),
            Err(e) => Err(self.latch(e)),
        }
    }

    #[must_use]
    pub fn limit(self, n: i64) -> Self {
        match self.guarded(Helper::Limit) {
            Ok(mut q) => {
                q.options.limit = Some(n);
                q
            }
            Err(q) => q,
        }
    }

    #[must_use]
    pub fn skip(self, n: u64) -> Self {
        match self.guarded(Helper::Skip) {
            Ok(mut q) => {
                q.options.skip = Some(n);
                q
            }
            Err(q) => q,
        }
    }

    #[must_use]
    pub fn batch_size(self, n: u32) -> Self {
        match self.guarded(Helper::BatchSize) {
            Ok(mut q) => {
                q.options.batch_size = Some(n);
                q
            }
            Err(q) => q,
        }
    }

    /// Index hint, forwarded to the adapter untouched.
    #[must_use]
    pub fn hint(self, index: BsonDocument) -> Self {
        match self.guarded(Helper::Hint) {
            Ok(mut q) => {
                q.options.hint = Some(index);
                q
            }
            Err(q) => q,
        }
    }

    #[must_use]
    pub fn tailable(self, yes: bool) -> Self {
        match self.guarded(Helper::Tailable) {
            Ok(mut q) => {
                q.options.tailable = yes;
                q
            }
            Err(q) => q,
        }
    }

    #[must_use]
    pub fn snapshot(self, yes: bool) -> Self {
        match self.guarded(Helper::Snapshot) {
            Ok(mut q) => {
                q.options.snapshot = yes;
                q
            }
            Err(q) => q,
        }
    }

    #[must_use]
    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.options.comment = Some(text.into());
        self
    }

    /// Server-side time budget hint; enforcement is the adapter's concern.
    #[must_use]
    pub fn max_time_ms(mut self, ms: u64) -> Self {
        self.options.max_time_ms = Some(ms);
        self
    }

    #[must_use]
    pub fn read_preference(mut self, pref: ReadPreference) -> Self {
        self.options.read_preference = Some(pref);
        self
    }

    #[must_use]
    pub fn upsert(mut self, yes: bool) -> Self {
        self.options.upsert = yes;
        self
    }

    #[must_use]
    pub fn multi(mut self, yes: bool) -> Self {
        self.options.multi = yes;
        self
    }

    /// For findAndModify: return the modified document instead of the
    /// original.
    #[must_use]
    pub fn return_new(mut self, yes: bool) -> Self {
        self.options.return_new = Some(yes);
        self
    }

    /// Treat the pending update document as a full replacement. This is the
    /// only way an empty update means "clear the target".
    #[must_use]
    pub fn overwrite(mut self, yes: bool) -> Self {
        self.options.overwrite = yes;
        self
    }

    /// Apply a bag of options by wire name. Unrecognized keys and wrongly
    /// shaped values are argument errors.
    #[must_use]
    pub fn apply_options(mut self, opts: BsonDocument) -> Self {
        for (key, value) in opts {
            let key_str: &str = key.as_ref();
            self = match (key_str, value) {
                ("sort", Bson::Document(d)) => self.sort(SortArg::Map(d)),
                ("sort", Bson::String(s)) => self.sort(SortArg::Text(s)),
                ("limit", Bson::Int32(n)) => self.limit(i64::from(n)),
                ("limit", Bson::Int64(n)) => self.limit(n),
                ("skip", Bson::Int32(n)) if n >= 0 => self.skip(n as u64),
                ("skip", Bson::Int64(n)) if n >= 0 => self.skip(n as u64),
                ("batchSize", Bson::Int32(n)) if n >= 0 => self.batch_size(n as u32),
                ("batchSize", Bson::Int64(n)) if n >= 0 => self.batch_size(n as u32),
                ("hint", Bson::Document(d)) => self.hint(d),
                ("comment", Bson::String(s)) => self.comment(s),
                ("maxTimeMS", Bson::Int32(n)) if n >= 0 => self.max_time_ms(n as u64),
                ("maxTimeMS", Bson::Int64(n)) if n >= 0 => self.max_time_ms(n as u64),
                ("tailable", Bson::Boolean(b)) => self.tailable(b),
                ("snapshot", Bson::Boolean(b)) => self.snapshot(b),
                ("readPreference", Bson::String(s)) => match s.parse::<ReadPreference>() {
                    Ok(pref) => self.read_preference(pref),
                    Err(msg) => self.latch(QueryError::argument("options", msg)),
                },
                ("upsert", Bson::Boolean(b)) => self.upsert(b),
                ("multi", Bson::Boolean(b)) => self.multi(b),
                ("new", Bson::Boolean(b)) => self.return_new(b),
                ("overwrite", Bson::Boolean(b)) => self.overwrite(b),
                ("select" | "fields", Bson::Document(d)) => self.select(SelectArg::Map(d)),
                ("select" | "fields", Bson::String(s)) => self.select(SelectArg::Text(s)),
                (key_str, value) => {
                    let msg = format!("unrecognized option `{key_str}` (value {value})");
                    self.latch(QueryError::argument("options", msg))
                }
            };
        }
        self
    }
}
