//! In-memory reference adapter. Interprets the compiled command language
//! against process-local collections so the crate is exercisable end-to-end
//! without a storage driver. Operators it cannot evaluate faithfully surface
//! `QueryError::Unsupported` instead of guessing.

use crate::adapter::Adapter;
use crate::command::{FindAndModifyCommand, FindCommand, RemoveCommand, UpdateCommand};
use crate::errors::QueryError;
use crate::query::is_operator_document;
use crate::types::{
    MAX_IN_SET, MAX_LIMIT, MAX_PROJECTION_FIELDS, MAX_SORT_FIELDS, RemoveReport, UpdateReport,
};
use bson::{Bson, Document as BsonDocument};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use uuid::Uuid;

struct Stored {
    id: String,
    body: BsonDocument,
}

#[derive(Default)]
pub struct MemoryAdapter {
    collections: RwLock<HashMap<String, Vec<Stored>>>,
}

impl MemoryAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document, minting an id for it. Returns the id.
    pub fn insert(&self, collection: &str, body: BsonDocument) -> String {
        let id = Uuid::new_v4().to_string();
        self.collections
            .write()
            .entry(collection.to_owned())
            .or_default()
            .push(Stored { id: id.clone(), body });
        id
    }

    /// Look a document up by the id `insert` minted for it.
    #[must_use]
    pub fn get(&self, collection: &str, id: &str) -> Option<BsonDocument> {
        self.collections
            .read()
            .get(collection)?
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.body.clone())
    }

    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections.read().get(collection).map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Snapshot of a collection's documents, in insertion order.
    #[must_use]
    pub fn documents(&self, collection: &str) -> Vec<BsonDocument> {
        self.collections
            .read()
            .get(collection)
            .map_or_else(Vec::new, |docs| docs.iter().map(|d| d.body.clone()).collect())
    }
}

impl Adapter for MemoryAdapter {
    fn find(&self, cmd: &FindCommand) -> Result<Vec<BsonDocument>, QueryError> {
        let mut matched = self.matching_bodies(cmd)?;
        if let Some(sort) = &cmd.sort {
            check_sort_spec(sort)?;
            matched.sort_by(|a, b| compare_docs(a, b, sort));
        }
        let matched = paginate(matched, cmd.skip, cmd.limit);
        let out = match &cmd.projection {
            Some(projection) => {
                let mut out = Vec::with_capacity(matched.len());
                for doc in &matched {
                    out.push(project(doc, projection)?);
                }
                out
            }
            None => matched,
        };
        log::debug!("find on {} returned {} documents", cmd.collection, out.len());
        Ok(out)
    }

    fn find_one(&self, cmd: &FindCommand) -> Result<Option<BsonDocument>, QueryError> {
        let mut matched = self.matching_bodies(cmd)?;
        if let Some(sort) = &cmd.sort {
            check_sort_spec(sort)?;
            matched.sort_by(|a, b| compare_docs(a, b, sort));
        }
        let skip = cmd.skip.unwrap_or(0) as usize;
        let Some(doc) = matched.into_iter().nth(skip) else {
            return Ok(None);
        };
        match &cmd.projection {
            Some(projection) => Ok(Some(project(&doc, projection)?)),
            None => Ok(Some(doc)),
        }
    }

    fn count(&self, cmd: &FindCommand) -> Result<u64, QueryError> {
        let matched = self.matching_bodies(cmd)?;
        Ok(matched.len() as u64)
    }

    fn distinct(&self, field: &str, cmd: &FindCommand) -> Result<Vec<Bson>, QueryError> {
        let matched = self.matching_bodies(cmd)?;
        let mut out: Vec<Bson> = Vec::new();
        for doc in &matched {
            let Some(value) = get_path(doc, field) else {
                continue;
            };
            // Array values contribute their elements, as servers do.
            match value {
                Bson::Array(items) => {
                    for item in items {
                        if !out.contains(item) {
                            out.push(item.clone());
                        }
                    }
                }
                other => {
                    if !out.contains(other) {
                        out.push(other.clone());
                    }
                }
            }
        }
        Ok(out)
    }

    fn update(&self, cmd: &UpdateCommand) -> Result<UpdateReport, QueryError> {
        let mut guard = self.collections.write();
        let docs = guard.entry(cmd.collection.clone()).or_default();
        let mut report = UpdateReport::default();
        for stored in docs.iter_mut() {
            if !matches(&stored.body, &cmd.conditions)? {
                continue;
            }
            report.matched += 1;
            let changed = if cmd.overwrite {
                let replaced = stored.body != cmd.document;
                stored.body = cmd.document.clone();
                replaced
            } else {
                apply_update_ops(&mut stored.body, &cmd.document)?
            };
            if changed {
                report.modified += 1;
            }
            if !cmd.multi {
                break;
            }
        }
        if report.matched == 0 && cmd.upsert {
            let mut body = seed_from_conditions(&cmd.conditions);
            if cmd.overwrite {
                body = cmd.document.clone();
            } else {
                apply_update_ops(&mut body, &cmd.document)?;
            }
            docs.push(Stored { id: Uuid::new_v4().to_string(), body });
            report.matched = 1;
            report.modified = 1;
        }
        Ok(report)
    }

    fn remove(&self, cmd: &RemoveCommand) -> Result<RemoveReport, QueryError> {
        let mut guard = self.collections.write();
        let Some(docs) = guard.get_mut(&cmd.collection) else {
            return Ok(RemoveReport::default());
        };
        let mut doomed: Vec<usize> = Vec::new();
        for (i, stored) in docs.iter().enumerate() {
            if matches(&stored.body, &cmd.conditions)? {
                doomed.push(i);
                if cmd.single {
                    break;
                }
            }
        }
        for i in doomed.iter().rev() {
            docs.remove(*i);
        }
        Ok(RemoveReport { removed: doomed.len() as u64 })
    }

    fn find_and_modify(
        &self,
        cmd: &FindAndModifyCommand,
    ) -> Result<Option<BsonDocument>, QueryError> {
        let mut guard = self.collections.write();
        let docs = guard.entry(cmd.collection.clone()).or_default();

        let mut candidates: Vec<usize> = Vec::new();
        for (i, stored) in docs.iter().enumerate() {
            if matches(&stored.body, &cmd.conditions)? {
                candidates.push(i);
            }
        }
        if let Some(sort) = &cmd.sort {
            check_sort_spec(sort)?;
            candidates.sort_by(|a, b| compare_docs(&docs[*a].body, &docs[*b].body, sort));
        }

        let Some(&target) = candidates.first() else {
            // No match: either upsert a fresh document or settle with None.
            if let Some(update) = &cmd.update
                && cmd.upsert
            {
                let mut body = seed_from_conditions(&cmd.conditions);
                apply_update_ops(&mut body, update)?;
                docs.push(Stored { id: Uuid::new_v4().to_string(), body: body.clone() });
                if cmd.return_new {
                    return Ok(Some(apply_fields(&body, cmd.fields.as_ref())?));
                }
            }
            return Ok(None);
        };

        match &cmd.update {
            Some(update) => {
                let before = docs[target].body.clone();
                apply_update_ops(&mut docs[target].body, update)?;
                let chosen = if cmd.return_new { docs[target].body.clone() } else { before };
                Ok(Some(apply_fields(&chosen, cmd.fields.as_ref())?))
            }
            None => {
                let removed = docs.remove(target);
                Ok(Some(apply_fields(&removed.body, cmd.fields.as_ref())?))
            }
        }
    }
}

fn apply_fields(
    doc: &BsonDocument,
    fields: Option<&BsonDocument>,
) -> Result<BsonDocument, QueryError> {
    match fields {
        Some(projection) => project(doc, projection),
        None => Ok(doc.clone()),
    }
}

impl MemoryAdapter {
    fn matching_bodies(&self, cmd: &FindCommand) -> Result<Vec<BsonDocument>, QueryError> {
        let guard = self.collections.read();
        let Some(docs) = guard.get(&cmd.collection) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for stored in docs {
            if matches(&stored.body, &cmd.conditions)? {
                out.push(stored.body.clone());
            }
        }
        Ok(out)
    }
}

fn paginate(docs: Vec<BsonDocument>, skip: Option<u64>, limit: Option<i64>) -> Vec<BsonDocument> {
    let skip = skip.unwrap_or(0) as usize;
    let limit = limit.filter(|n| *n > 0).unwrap_or(MAX_LIMIT).min(MAX_LIMIT) as usize;
    if skip >= docs.len() {
        return Vec::new();
    }
    let end = (skip + limit).min(docs.len());
    docs[skip..end].to_vec()
}

// --- condition evaluation ------------------------------------------------

pub(crate) fn matches(doc: &BsonDocument, conditions: &BsonDocument) -> Result<bool, QueryError> {
    for (key, predicate) in conditions.iter() {
        let key: &str = key.as_ref();
        let ok = match key {
            "$and" => {
                let mut all = true;
                for b in logical_branches(predicate, "$and")? {
                    if !matches(doc, b)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for b in logical_branches(predicate, "$or")? {
                    if matches(doc, b)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$nor" => {
                let mut none = true;
                for b in logical_branches(predicate, "$nor")? {
                    if matches(doc, b)? {
                        none = false;
                        break;
                    }
                }
                none
            }
            "$comment" => true,
            path => match_path(doc, path, predicate)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn logical_branches<'a>(
    predicate: &'a Bson,
    op: &str,
) -> Result<Vec<&'a BsonDocument>, QueryError> {
    let Bson::Array(items) = predicate else {
        return Err(QueryError::Adapter(format!("{op} expects an array of conditions")));
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let Bson::Document(d) = item else {
            return Err(QueryError::Adapter(format!("{op} branches must be documents")));
        };
        out.push(d);
    }
    Ok(out)
}

fn match_path(doc: &BsonDocument, path: &str, predicate: &Bson) -> Result<bool, QueryError> {
    match predicate {
        Bson::Document(spec) if is_operator_document(spec) => {
            for (op, operand) in spec.iter() {
                let op: &str = op.as_ref();
                if !apply_op(doc, path, op, operand)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        other => Ok(get_path(doc, path) == Some(other)),
    }
}

fn apply_op(doc: &BsonDocument, path: &str, op: &str, operand: &Bson) -> Result<bool, QueryError> {
    let value = get_path(doc, path);
    match op {
        "$eq" => Ok(value == Some(operand)),
        "$ne" => Ok(value != Some(operand)),
        "$gt" => Ok(value.is_some_and(|v| compare_values(v, operand) == Ordering::Greater)),
        "$gte" => Ok(value.is_some_and(|v| compare_values(v, operand) != Ordering::Less)),
        "$lt" => Ok(value.is_some_and(|v| compare_values(v, operand) == Ordering::Less)),
        "$lte" => Ok(value.is_some_and(|v| compare_values(v, operand) != Ordering::Greater)),
        "$in" => {
            let set = operand_array(op, operand)?;
            Ok(value.is_some_and(|v| in_set(v, set)))
        }
        "$nin" => {
            let set = operand_array(op, operand)?;
            Ok(!value.is_some_and(|v| in_set(v, set)))
        }
        "$all" => {
            let wanted = operand_array(op, operand)?;
            Ok(match value {
                Some(Bson::Array(items)) => wanted.iter().all(|w| items.contains(w)),
                _ => false,
            })
        }
        "$exists" => match operand {
            Bson::Boolean(b) => Ok(value.is_some() == *b),
            _ => Err(QueryError::Adapter("$exists expects a boolean".into())),
        },
        "$size" => {
            let n = operand_i64(op, operand)?;
            Ok(matches!(value, Some(Bson::Array(items)) if items.len() as i64 == n))
        }
        "$mod" => {
            let spec = operand_array(op, operand)?;
            if spec.len() != 2 {
                return Err(QueryError::Adapter("$mod expects [divisor, remainder]".into()));
            }
            let divisor = operand_i64(op, &spec[0])?;
            let remainder = operand_i64(op, &spec[1])?;
            if divisor == 0 {
                return Err(QueryError::Adapter("$mod by zero".into()));
            }
            Ok(value.and_then(numeric_i64).is_some_and(|v| v % divisor == remainder))
        }
        "$elemMatch" => {
            let Bson::Document(inner) = operand else {
                return Err(QueryError::Adapter("$elemMatch expects a document".into()));
            };
            let Some(Bson::Array(items)) = value else {
                return Ok(false);
            };
            for item in items {
                if let Bson::Document(element) = item
                    && matches(element, inner)?
                {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        #[cfg(feature = "regex")]
        "$regex" => {
            let Bson::String(pattern) = operand else {
                return Err(QueryError::Adapter("$regex expects a pattern string".into()));
            };
            match value {
                Some(Bson::String(s)) => Ok(regex::Regex::new(pattern)
                    .map_err(|e| QueryError::Adapter(format!("bad $regex: {e}")))?
                    .is_match(s)),
                _ => Ok(false),
            }
        }
        "$geoWithin" | "$within" => geo_within(value, operand),
        other => Err(QueryError::Unsupported(other.to_owned())),
    }
}

fn operand_array<'a>(op: &str, operand: &'a Bson) -> Result<&'a Vec<Bson>, QueryError> {
    match operand {
        Bson::Array(items) => {
            if items.len() > MAX_IN_SET {
                log::warn!("{op} set unusually large: {} entries", items.len());
            }
            Ok(items)
        }
        _ => Err(QueryError::Adapter(format!("{op} expects an array operand"))),
    }
}

fn operand_i64(op: &str, operand: &Bson) -> Result<i64, QueryError> {
    numeric_i64(operand).ok_or_else(|| QueryError::Adapter(format!("{op} expects a number")))
}

fn numeric_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(n) => Some(i64::from(*n)),
        Bson::Int64(n) => Some(*n),
        Bson::Double(n) => Some(*n as i64),
        _ => None,
    }
}

fn in_set(value: &Bson, set: &[Bson]) -> bool {
    if set.iter().take(MAX_IN_SET).any(|x| x == value) {
        return true;
    }
    // An array value matches when any of its elements is in the set.
    match value {
        Bson::Array(items) => items.iter().any(|item| set.contains(item)),
        _ => false,
    }
}

// --- geo containment ------------------------------------------------------

fn geo_within(value: Option<&Bson>, operand: &Bson) -> Result<bool, QueryError> {
    let Bson::Document(shape) = operand else {
        return Err(QueryError::Adapter("containment expects a shape document".into()));
    };
    let Some(point) = value.and_then(as_point) else {
        return Ok(false);
    };
    if let Some(Bson::Array(corners)) = shape.get("$box") {
        let (Some(ll), Some(ur)) = (
            corners.first().and_then(as_point),
            corners.get(1).and_then(as_point),
        ) else {
            return Err(QueryError::Adapter("$box expects two corner points".into()));
        };
        return Ok(point[0] >= ll[0] && point[0] <= ur[0] && point[1] >= ll[1] && point[1] <= ur[1]);
    }
    for key in ["$center", "$centerSphere"] {
        if let Some(Bson::Array(spec)) = shape.get(key) {
            let (Some(center), Some(radius)) = (
                spec.first().and_then(as_point),
                spec.get(1).and_then(as_f64),
            ) else {
                return Err(QueryError::Adapter(format!("{key} expects [center, radius]")));
            };
            let dx = point[0] - center[0];
            let dy = point[1] - center[1];
            return Ok(dx * dx + dy * dy <= radius * radius);
        }
    }
    Err(QueryError::Unsupported("containment shapes beyond $box/$center".into()))
}

fn as_point(value: &Bson) -> Option<[f64; 2]> {
    match value {
        Bson::Array(items) if items.len() == 2 => {
            Some([as_f64(&items[0])?, as_f64(&items[1])?])
        }
        _ => None,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

// --- ordering --------------------------------------------------------------

fn check_sort_spec(sort: &BsonDocument) -> Result<(), QueryError> {
    for (_, dir) in sort.iter() {
        if matches!(dir, Bson::Document(_)) {
            return Err(QueryError::Unsupported("$meta sort".into()));
        }
    }
    Ok(())
}

fn compare_docs(a: &BsonDocument, b: &BsonDocument, sort: &BsonDocument) -> Ordering {
    for (path, dir) in sort.iter().take(MAX_SORT_FIELDS) {
        let path: &str = path.as_ref();
        let descending = matches!(dir, Bson::Int32(n) if *n < 0)
            || matches!(dir, Bson::Int64(n) if *n < 0);
        let ord = match (get_path(a, path), get_path(b, path)) {
            (Some(x), Some(y)) => compare_values(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if descending { ord.reverse() } else { ord };
        }
    }
    Ordering::Equal
}

/// Cross-type comparison: numbers compare numerically across integer widths,
/// then strings, then booleans, everything else by type rank.
pub(crate) fn compare_values(a: &Bson, b: &Bson) -> Ordering {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.total_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::Null => 0,
        Bson::Boolean(_) => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => 2,
        Bson::String(_) => 3,
        Bson::Array(_) => 4,
        Bson::Document(_) => 5,
        _ => 6,
    }
}

// --- dotted-path access -----------------------------------------------------

const MAX_PATH_DEPTH: usize = 32;

fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    if path.is_empty() || path.len() > 1024 {
        return None;
    }
    let mut cur = doc;
    let parts: Vec<&str> = path.split('.').collect();
    if parts.len() > MAX_PATH_DEPTH {
        return None;
    }
    for (i, part) in parts.iter().enumerate() {
        if i + 1 == parts.len() {
            return cur.get(*part);
        }
        match cur.get(*part) {
            Some(Bson::Document(d)) => cur = d,
            _ => return None,
        }
    }
    None
}

fn ensure_subdoc<'a>(root: &'a mut BsonDocument, key: &str) -> &'a mut BsonDocument {
    let needs_new = !matches!(root.get(key), Some(Bson::Document(_)));
    if needs_new {
        root.insert(key.to_owned(), Bson::Document(BsonDocument::new()));
    }
    match root.get_mut(key) {
        Some(Bson::Document(d)) => d,
        // Just inserted above; anything else would be a bson bug.
        _ => panic!("subdocument slot vanished"),
    }
}

fn set_path(root: &mut BsonDocument, path: &str, value: Bson) -> bool {
    let mut parts: Vec<&str> = path.split('.').collect();
    let last = parts.pop().unwrap_or(path);
    let mut cur = root;
    for part in parts {
        cur = ensure_subdoc(cur, part);
    }
    let changed = cur.get(last) != Some(&value);
    cur.insert(last.to_owned(), value);
    changed
}

fn remove_path(root: &mut BsonDocument, path: &str) -> Option<Bson> {
    let mut parts: Vec<&str> = path.split('.').collect();
    let last = parts.pop().unwrap_or(path);
    let mut cur = root;
    for part in parts {
        match cur.get_mut(part) {
            Some(Bson::Document(d)) => cur = d,
            _ => return None,
        }
    }
    cur.remove(last)
}

// --- update application -----------------------------------------------------

pub(crate) fn apply_update_ops(
    body: &mut BsonDocument,
    update: &BsonDocument,
) -> Result<bool, QueryError> {
    let mut changed = false;
    for (op, operand) in update.iter() {
        let op: &str = op.as_ref();
        match op {
            "$set" => {
                let group = operand_group(op, operand)?;
                for (path, value) in group.clone() {
                    if set_path(body, path.as_ref(), value) {
                        changed = true;
                    }
                }
            }
            "$inc" => {
                let group = operand_group(op, operand)?;
                for (path, delta) in group.iter() {
                    let path: &str = path.as_ref();
                    let delta = as_f64(delta)
                        .ok_or_else(|| QueryError::Adapter("$inc expects a number".into()))?;
                    let current = get_path(body, path).and_then(as_f64).unwrap_or(0.0);
                    set_path(body, path, Bson::Double(current + delta));
                    changed = true;
                }
            }
            "$unset" => {
                let group = operand_group(op, operand)?;
                for (path, _) in group.iter() {
                    let path: &str = path.as_ref();
                    if remove_path(body, path).is_some() {
                        changed = true;
                    }
                }
            }
            other => return Err(QueryError::Unsupported(format!("update operator {other}"))),
        }
    }
    Ok(changed)
}

fn operand_group<'a>(op: &str, operand: &'a Bson) -> Result<&'a BsonDocument, QueryError> {
    match operand {
        Bson::Document(d) => Ok(d),
        _ => Err(QueryError::Adapter(format!("{op} expects a document operand"))),
    }
}

/// Upserts start from the scalar-equality fields of the conditions.
fn seed_from_conditions(conditions: &BsonDocument) -> BsonDocument {
    let mut body = BsonDocument::new();
    for (key, value) in conditions.iter() {
        let key: &str = key.as_ref();
        if key.starts_with('$') {
            continue;
        }
        match value {
            Bson::Document(d) if is_operator_document(d) => {}
            other => {
                set_path(&mut body, key, other.clone());
            }
        }
    }
    body
}

// --- projection -------------------------------------------------------------

fn project(doc: &BsonDocument, projection: &BsonDocument) -> Result<BsonDocument, QueryError> {
    let mut includes: Vec<&str> = Vec::new();
    let mut excludes: Vec<&str> = Vec::new();
    let mut slices: Vec<(&str, &Bson)> = Vec::new();
    for (path, spec) in projection.iter() {
        let path: &str = path.as_ref();
        match spec {
            Bson::Int32(0) | Bson::Int64(0) => excludes.push(path),
            Bson::Int32(_) | Bson::Int64(_) => includes.push(path),
            Bson::Document(d) => match d.get("$slice") {
                Some(spec) => slices.push((path, spec)),
                None => {
                    return Err(QueryError::Unsupported(format!("projection entry for {path}")));
                }
            },
            _ => return Err(QueryError::Unsupported(format!("projection entry for {path}"))),
        }
    }

    let mut out = if includes.is_empty() {
        let mut out = doc.clone();
        for path in excludes {
            remove_path(&mut out, path);
        }
        out
    } else {
        let mut out = BsonDocument::new();
        for path in includes.into_iter().take(MAX_PROJECTION_FIELDS) {
            if let Some(value) = get_path(doc, path) {
                set_path(&mut out, path, value.clone());
            }
        }
        out
    };

    for (path, spec) in slices {
        let Some(Bson::Array(items)) = get_path(doc, path) else {
            continue;
        };
        let window = slice_array(items, spec)?;
        set_path(&mut out, path, Bson::Array(window));
    }
    Ok(out)
}

fn slice_array(items: &[Bson], spec: &Bson) -> Result<Vec<Bson>, QueryError> {
    match spec {
        Bson::Int32(_) | Bson::Int64(_) => {
            let n = numeric_i64(spec).unwrap_or(0);
            if n >= 0 {
                Ok(items.iter().take(n as usize).cloned().collect())
            } else {
                let keep = (-n) as usize;
                let start = items.len().saturating_sub(keep);
                Ok(items[start..].to_vec())
            }
        }
        Bson::Array(window) if window.len() == 2 => {
            let skip = numeric_i64(&window[0])
                .ok_or_else(|| QueryError::Adapter("$slice skip must be a number".into()))?;
            let limit = numeric_i64(&window[1])
                .ok_or_else(|| QueryError::Adapter("$slice limit must be a number".into()))?;
            let start = if skip >= 0 {
                (skip as usize).min(items.len())
            } else {
                items.len().saturating_sub((-skip) as usize)
            };
            let end = (start + limit.max(0) as usize).min(items.len());
            Ok(items[start..end].to_vec())
        }
        _ => Err(QueryError::Adapter("$slice expects n or [skip, limit]".into())),
    }
}
