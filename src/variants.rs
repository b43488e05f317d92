//! Side-channel cache of precomputed responsive variants. Fetch results that
//! carry `responsive_breakpoints` metadata populate this map so later layout
//! decisions can skip a round trip. Population is best-effort: a document
//! missing any key is skipped silently and the primary result path is never
//! blocked or failed.

use bson::{Bson, Document as BsonDocument};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantKey {
    pub identifier: String,
    pub kind: String,
    pub variant: String,
    pub transformation: String,
    pub format: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeDescriptor {
    pub width: i64,
    pub height: i64,
    pub bytes: i64,
}

static CACHE: LazyLock<RwLock<HashMap<VariantKey, Vec<SizeDescriptor>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

#[must_use]
pub fn lookup(key: &VariantKey) -> Option<Vec<SizeDescriptor>> {
    CACHE.read().get(key).cloned()
}

pub fn store(key: VariantKey, sizes: Vec<SizeDescriptor>) {
    CACHE.write().insert(key, sizes);
}

pub fn clear() {
    CACHE.write().clear();
}

#[must_use]
pub fn len() -> usize {
    CACHE.read().len()
}

/// Scan one fetched document for variant metadata and absorb whatever is
/// complete. Anything malformed is ignored.
pub(crate) fn absorb(doc: &BsonDocument) {
    let Some(Bson::Array(entries)) = doc.get("responsive_breakpoints") else {
        return;
    };
    let Some(identifier) = str_field(doc, "public_id") else {
        return;
    };
    let kind = str_field(doc, "resource_type").unwrap_or_else(|| "image".to_owned());
    let variant = str_field(doc, "type").unwrap_or_else(|| "upload".to_owned());
    let format = str_field(doc, "format").unwrap_or_default();

    for entry in entries {
        let Bson::Document(entry) = entry else {
            continue;
        };
        let Some(transformation) = str_field(entry, "transformation") else {
            continue;
        };
        let Some(Bson::Array(points)) = entry.get("breakpoints") else {
            continue;
        };
        let sizes: Vec<SizeDescriptor> = points
            .iter()
            .filter_map(|p| match p {
                Bson::Document(p) => Some(SizeDescriptor {
                    width: int_field(p, "width")?,
                    height: int_field(p, "height")?,
                    bytes: int_field(p, "bytes").unwrap_or(0),
                }),
                _ => None,
            })
            .collect();
        if sizes.is_empty() {
            continue;
        }
        store(
            VariantKey {
                identifier: identifier.clone(),
                kind: kind.clone(),
                variant: variant.clone(),
                transformation,
                format: format.clone(),
            },
            sizes,
        );
    }
}

fn str_field(doc: &BsonDocument, key: &str) -> Option<String> {
    match doc.get(key) {
        Some(Bson::String(s)) => Some(s.clone()),
        _ => None,
    }
}

fn int_field(doc: &BsonDocument, key: &str) -> Option<i64> {
    match doc.get(key) {
        Some(Bson::Int32(n)) => Some(i64::from(*n)),
        Some(Bson::Int64(n)) => Some(*n),
        Some(Bson::Double(n)) => Some(*n as i64),
        _ => None,
    }
}
