use crate::errors::QueryError;
use crate::query::Query;
use crate::query::options::SortForm;
use crate::query::validate::{self, Helper};
use crate::types::MAX_SORT_FIELDS;
use bson::{Bson, Document as BsonDocument};

/// Field-selection input: a whitespace-delimited token string (leading `-`
/// excludes), a token list, or an explicit projection document.
pub enum SelectArg {
    Text(String),
    Fields(Vec<String>),
    Map(BsonDocument),
}

impl From<&str> for SelectArg {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for SelectArg {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<&str>> for SelectArg {
    fn from(fields: Vec<&str>) -> Self {
        Self::Fields(fields.into_iter().map(str::to_owned).collect())
    }
}

impl From<Vec<String>> for SelectArg {
    fn from(fields: Vec<String>) -> Self {
        Self::Fields(fields)
    }
}

impl From<BsonDocument> for SelectArg {
    fn from(doc: BsonDocument) -> Self {
        Self::Map(doc)
    }
}

/// `$slice` projection argument: last `n` elements, or a `[skip, limit]`
/// window.
pub enum SliceArg {
    Last(i64),
    Window(i64, i64),
}

impl From<i64> for SliceArg {
    fn from(n: i64) -> Self {
        Self::Last(n)
    }
}

impl From<i32> for SliceArg {
    fn from(n: i32) -> Self {
        Self::Last(i64::from(n))
    }
}

impl From<(i64, i64)> for SliceArg {
    fn from((skip, limit): (i64, i64)) -> Self {
        Self::Window(skip, limit)
    }
}

impl From<[i64; 2]> for SliceArg {
    fn from([skip, limit]: [i64; 2]) -> Self {
        Self::Window(skip, limit)
    }
}

/// Sort input: a pair list, a whitespace token string (leading `-` descends),
/// or a direction map. The pair-list and map forms are mutually exclusive
/// for the lifetime of a builder.
pub enum SortArg {
    Pairs(Vec<(String, i32)>),
    Text(String),
    Map(BsonDocument),
}

impl From<&str> for SortArg {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for SortArg {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<(&str, i32)>> for SortArg {
    fn from(pairs: Vec<(&str, i32)>) -> Self {
        Self::Pairs(pairs.into_iter().map(|(p, d)| (p.to_owned(), d)).collect())
    }
}

impl From<Vec<(String, i32)>> for SortArg {
    fn from(pairs: Vec<(String, i32)>) -> Self {
        Self::Pairs(pairs)
    }
}

impl From<BsonDocument> for SortArg {
    fn from(doc: BsonDocument) -> Self {
        Self::Map(doc)
    }
}

impl Query {
    /// Choose which fields fetched documents carry. String and list forms
    /// fold into the same projection document as the map form; one call may
    /// not mix inclusion with exclusion beyond the leading-minus convention.
    #[must_use]
    pub fn select(self, arg: impl Into<SelectArg>) -> Self {
        if let Err(e) = validate::check(self.op, Helper::Select) {
            return self.latch(e);
        }
        let entries = match normalize_select(arg.into()) {
            Ok(entries) => entries,
            Err(e) => return self.latch(e),
        };
        let mut q = self;
        for (path, spec) in entries {
            q.projection.insert(path, spec);
        }
        q
    }

    /// Project a window of an array field. Composes with `select`; the
    /// validator rejects it for distinct.
    #[must_use]
    pub fn slice(self, path: impl Into<String>, arg: impl Into<SliceArg>) -> Self {
        if let Err(e) = validate::check(self.op, Helper::Slice) {
            return self.latch(e);
        }
        let spec = match arg.into() {
            SliceArg::Last(n) => Bson::Int64(n),
            SliceArg::Window(skip, limit) => {
                Bson::Array(vec![Bson::Int64(skip), Bson::Int64(limit)])
            }
        };
        let mut q = self;
        let mut entry = BsonDocument::new();
        entry.insert("$slice", spec);
        q.projection.insert(path.into(), entry);
        q
    }

    /// Record sort order. Repeated same-form calls accumulate; switching
    /// between the pair-list form and the map/string form is a state error.
    #[must_use]
    pub fn sort(self, arg: impl Into<SortArg>) -> Self {
        if let Err(e) = validate::check(self.op, Helper::Sort) {
            return self.latch(e);
        }
        let mut q = self;
        match arg.into() {
            SortArg::Pairs(pairs) => {
                if q.options.sort_form == Some(SortForm::Map) {
                    return q.latch(QueryError::state("sort", "can't mix sort syntaxes"));
                }
                q.options.sort_form = Some(SortForm::Pairs);
                for (path, dir) in pairs {
                    if dir != 1 && dir != -1 {
                        return q.latch(QueryError::argument(
                            "sort",
                            format!("invalid sort direction `{dir}` for field `{path}`"),
                        ));
                    }
                    q.options.sort.insert(path, Bson::Int32(dir));
                }
            }
            SortArg::Text(text) => {
                if q.options.sort_form == Some(SortForm::Pairs) {
                    return q.latch(QueryError::state("sort", "can't mix sort syntaxes"));
                }
                q.options.sort_form = Some(SortForm::Map);
                for token in text.split_whitespace() {
                    match token.strip_prefix('-') {
                        Some(path) => q.options.sort.insert(path, Bson::Int32(-1)),
                        None => q.options.sort.insert(token, Bson::Int32(1)),
                    };
                }
            }
            SortArg::Map(map) => {
                if q.options.sort_form == Some(SortForm::Pairs) {
                    return q.latch(QueryError::state("sort", "can't mix sort syntaxes"));
                }
                q.options.sort_form = Some(SortForm::Map);
                for (path, dir) in map {
                    match parse_direction(&path, dir) {
                        Ok(spec) => q.options.sort.insert(path, spec),
                        Err(e) => return q.latch(e),
                    };
                }
            }
        }
        if q.options.sort.len() > MAX_SORT_FIELDS {
            log::warn!("sort spec unusually long: {} fields", q.options.sort.len());
        }
        q
    }
}

fn normalize_select(arg: SelectArg) -> Result<Vec<(String, Bson)>, QueryError> {
    let tokens = match arg {
        SelectArg::Text(s) => s.split_whitespace().map(str::to_owned).collect(),
        SelectArg::Fields(fields) => fields,
        SelectArg::Map(map) => {
            let mut out = Vec::new();
            let mut includes = false;
            let mut excludes = false;
            for (path, spec) in map {
                match &spec {
                    Bson::Int32(0) | Bson::Int64(0) => excludes = true,
                    Bson::Int32(_) | Bson::Int64(_) => includes = true,
                    Bson::Document(d) if d.get("$slice").is_some() => {}
                    other => {
                        return Err(QueryError::argument(
                            "select",
                            format!("unsupported projection value {other} for `{path}`"),
                        ));
                    }
                }
                out.push((path, spec));
            }
            if includes && excludes {
                return Err(QueryError::argument(
                    "select",
                    "cannot mix inclusion and exclusion in one call",
                ));
            }
            return Ok(out);
        }
    };

    let mut out = Vec::new();
    let mut includes = false;
    let mut excludes = false;
    for token in tokens {
        match token.strip_prefix('-') {
            Some(path) => {
                excludes = true;
                out.push((path.to_owned(), Bson::Int32(0)));
            }
            None => {
                includes = true;
                out.push((token, Bson::Int32(1)));
            }
        }
    }
    if includes && excludes {
        return Err(QueryError::argument(
            "select",
            "cannot mix inclusion and exclusion in one call",
        ));
    }
    Ok(out)
}

fn parse_direction(path: &str, dir: Bson) -> Result<Bson, QueryError> {
    match dir {
        Bson::Int32(1 | -1) => Ok(dir),
        Bson::Int64(1) => Ok(Bson::Int32(1)),
        Bson::Int64(-1) => Ok(Bson::Int32(-1)),
        Bson::Double(d) if d == 1.0 => Ok(Bson::Int32(1)),
        Bson::Double(d) if d == -1.0 => Ok(Bson::Int32(-1)),
        Bson::String(ref s) => match s.as_str() {
            "asc" | "ascending" => Ok(Bson::Int32(1)),
            "desc" | "descending" => Ok(Bson::Int32(-1)),
            other => Err(QueryError::argument(
                "sort",
                format!("invalid sort direction `{other}` for field `{path}`"),
            )),
        },
        // Relevance-score marker passes through for the adapter to honor.
        Bson::Document(ref d) if d.get("$meta").is_some() => Ok(dir),
        other => Err(QueryError::argument(
            "sort",
            format!("invalid sort direction `{other}` for field `{path}`"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn string_and_map_select_fold_identically() {
        let a = Query::new("users").select("name age");
        let b = Query::new("users").select(doc! { "name": 1_i32, "age": 1_i32 });
        assert_eq!(a.projection(), b.projection());
    }

    #[test]
    fn leading_minus_excludes() {
        let q = Query::new("users").select("-password -secret");
        assert_eq!(q.projection(), &doc! { "password": 0_i32, "secret": 0_i32 });
    }

    #[test]
    fn mixed_polarity_in_one_call_is_rejected() {
        let q = Query::new("users").select("name -password");
        assert!(matches!(q.chain_error(), Some(QueryError::ArgumentShape { call: "select", .. })));
    }

    #[test]
    fn sort_text_form_descends_on_minus() {
        let q = Query::new("users").sort("-age name");
        assert_eq!(q.options().sort, doc! { "age": -1_i32, "name": 1_i32 });
    }

    #[test]
    fn sort_mixing_forms_is_a_state_error() {
        let q = Query::new("users").sort(vec![("a", 1)]).sort(doc! { "b": -1_i32 });
        assert!(matches!(q.chain_error(), Some(QueryError::State { call: "sort", .. })));
    }

    #[test]
    fn sort_same_form_accumulates() {
        let q = Query::new("users").sort(vec![("a", 1)]).sort(vec![("b", -1)]);
        assert!(q.chain_error().is_none());
        assert_eq!(q.options().sort, doc! { "a": 1_i32, "b": -1_i32 });
    }

    #[test]
    fn sort_word_directions_parse() {
        let q = Query::new("users").sort(doc! { "a": "asc", "b": "descending" });
        assert_eq!(q.options().sort, doc! { "a": 1_i32, "b": -1_i32 });
    }

    #[test]
    fn sort_unknown_token_names_field_and_token() {
        let q = Query::new("users").sort(doc! { "a": "sideways" });
        match q.chain_error() {
            Some(QueryError::ArgumentShape { message, .. }) => {
                assert!(message.contains("sideways") && message.contains('a'));
            }
            other => panic!("expected argument error, got {other:?}"),
        }
    }

    #[test]
    fn slice_writes_window_spec() {
        let q = Query::new("users").slice("comments", [5_i64, 10_i64]);
        assert_eq!(
            q.projection(),
            &doc! { "comments": { "$slice": [5_i64, 10_i64] } }
        );
    }
}
