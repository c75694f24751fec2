//! Local evaluation of filters against JSON documents.

use crate::ast::{Filter, Query, SortOrder};
use serde_json::Value;
use std::cmp::Ordering;

/// Looks up a possibly-dotted field path in a document.
fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Compares two scalar JSON values.
///
/// Numbers compare numerically, strings lexicographically, booleans as
/// false < true. Mixed or non-scalar types are not ordered.
fn compare_scalars(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn scalars_equal(a: &Value, b: &Value) -> bool {
    match compare_scalars(a, b) {
        Some(ordering) => ordering == Ordering::Equal,
        None => a == b,
    }
}

impl Filter {
    /// Evaluates the filter against a JSON document.
    ///
    /// Missing fields never match except under `Exists(_, false)`.
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::Eq(field, value) => {
                lookup(doc, field).is_some_and(|v| scalars_equal(v, value))
            }
            Filter::Ne(field, value) => {
                lookup(doc, field).is_some_and(|v| !scalars_equal(v, value))
            }
            Filter::Gt(field, value) => cmp_matches(doc, field, value, Ordering::is_gt),
            Filter::Gte(field, value) => cmp_matches(doc, field, value, Ordering::is_ge),
            Filter::Lt(field, value) => cmp_matches(doc, field, value, Ordering::is_lt),
            Filter::Lte(field, value) => cmp_matches(doc, field, value, Ordering::is_le),
            Filter::StartsWith(field, prefix) => lookup(doc, field)
                .and_then(Value::as_str)
                .is_some_and(|s| s.starts_with(prefix.as_str())),
            Filter::Contains(field, needle) => lookup(doc, field)
                .and_then(Value::as_str)
                .is_some_and(|s| s.contains(needle.as_str())),
            Filter::Exists(field, present) => lookup(doc, field).is_some() == *present,
            Filter::In(field, values) => {
                lookup(doc, field).is_some_and(|v| values.iter().any(|c| scalars_equal(v, c)))
            }
            Filter::And(children) => children.iter().all(|f| f.matches(doc)),
            Filter::Or(children) => children.iter().any(|f| f.matches(doc)),
        }
    }
}

fn cmp_matches(doc: &Value, field: &str, value: &Value, accept: fn(Ordering) -> bool) -> bool {
    lookup(doc, field)
        .and_then(|v| compare_scalars(v, value))
        .is_some_and(accept)
}

/// Applies a full query (filter, sort, skip, limit) to document/payload
/// pairs and returns the surviving payloads.
///
/// The caller supplies each payload alongside its JSON projection so typed
/// records can be selected without a second serialization pass.
pub fn select<T>(items: Vec<(Value, T)>, query: &Query) -> Vec<T> {
    let mut selected: Vec<(Value, T)> = match &query.filter {
        Some(filter) => items
            .into_iter()
            .filter(|(doc, _)| filter.matches(doc))
            .collect(),
        None => items,
    };

    if let Some((field, order)) = &query.sort {
        selected.sort_by(|(a, _), (b, _)| {
            let ordering = match (lookup(a, field), lookup(b, field)) {
                (Some(x), Some(y)) => compare_scalars(x, y).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            };
            match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
    }

    let skip = query.skip.unwrap_or(0) as usize;
    let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);

    selected
        .into_iter()
        .skip(skip)
        .take(limit)
        .map(|(_, payload)| payload)
        .collect()
}
