//! Dot-path condition matching
//!
//! The cheap tier of feature gating: each key of a condition map is a dot
//! path into the context, each value the expected value (or a list of
//! acceptable values). Comparison is on string form so `"3"` and `3` match,
//! which tolerates loosely typed configuration.

use crate::value::{Mapping, Value};

static NIL: Value = Value::Null;

/// Check whether every condition holds against `ctx`.
///
/// An empty condition map always matches.
pub fn match_conditions(conditions: &Mapping, ctx: &Value) -> bool {
    conditions.iter().all(|(path, expected)| {
        let Some(actual) = resolve(ctx, path) else {
            log::trace!("condition path '{path}' does not resolve");
            return false;
        };

        match expected {
            Value::Sequence(options) => options.iter().any(|option| loosely_equal(actual, option)),
            single => loosely_equal(actual, single),
        }
    })
}

/// Walk `path` through nested mappings.
///
/// Returns `None` when an intermediate segment is missing or not a mapping.
/// A missing final segment resolves to nil.
fn resolve<'a>(ctx: &'a Value, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.').peekable();
    let mut current = ctx;

    while let Some(segment) = segments.next() {
        let map = current.as_mapping()?;
        match map.get(segment) {
            Some(next) => current = next,
            None if segments.peek().is_none() => return Some(&NIL),
            None => return None,
        }
    }

    Some(current)
}

/// String-form equality; nil only equals nil
fn loosely_equal(actual: &Value, expected: &Value) -> bool {
    match (actual.is_null(), expected.is_null()) {
        (true, true) => true,
        (false, false) => actual.to_plain_string() == expected.to_plain_string(),
        _ => false,
    }
}
