//! Process-wide configuration. Two knobs only, both with explicit get/set
//! accessors, both intended to be set once at startup and read concurrently
//! afterwards.

use crate::trace::TraceFn;
use parking_lot::RwLock;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether containment predicates compile to the modern `$geoWithin` name.
/// Legacy stores expect `$within`.
static MODERN_WITHIN: AtomicBool = AtomicBool::new(true);

static DEFAULT_TRACE: LazyLock<RwLock<Option<TraceFn>>> = LazyLock::new(|| RwLock::new(None));

pub fn set_modern_within(enabled: bool) {
    MODERN_WITHIN.store(enabled, Ordering::Relaxed);
}

#[must_use]
pub fn modern_within() -> bool {
    MODERN_WITHIN.load(Ordering::Relaxed)
}

/// The operator name containment predicates resolve to at commit time.
#[must_use]
pub fn within_operator() -> &'static str {
    if modern_within() { "$geoWithin" } else { "$within" }
}

/// Install (or clear) the fallback trace hook used by builders that carry no
/// instance-level hook of their own.
pub fn set_default_trace(hook: Option<TraceFn>) {
    *DEFAULT_TRACE.write() = hook;
}

#[must_use]
pub fn default_trace() -> Option<TraceFn> {
    DEFAULT_TRACE.read().clone()
}
