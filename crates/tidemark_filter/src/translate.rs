//! Filter translation and query fingerprinting.

use crate::ast::{Filter, Query, SortOrder};
use crate::error::FilterResult;
use serde_json::{json, Map, Value};

/// Converts queries into backend filter strings and normalized
/// fingerprint keys.
///
/// Each network backend pairs the shared [`Filter`] AST with its own
/// translator. The fingerprint identifies a distinct (collection, query)
/// pair and is the key under which delta-fetch state is tracked, so it
/// must be stable across equal queries.
pub trait FilterTranslator: Send + Sync {
    /// Translates a query into the backend's filter string.
    ///
    /// An unfiltered query translates to the backend's match-all filter.
    /// Unsupported operators are rejected here, before any I/O.
    fn translate(&self, query: &Query) -> FilterResult<String>;

    /// Returns the normalized fingerprint for a (collection, query) pair.
    fn fingerprint(&self, collection: &str, query: &Query) -> String;
}

/// Translator producing Mongo-style JSON filter strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoTranslator;

impl MongoTranslator {
    /// Creates a new translator.
    pub fn new() -> Self {
        Self
    }

    fn filter_to_value(filter: &Filter) -> FilterResult<Value> {
        let value = match filter {
            Filter::Eq(field, value) => json!({ field: value }),
            Filter::Ne(field, value) => json!({ field: { "$ne": value } }),
            Filter::Gt(field, value) => json!({ field: { "$gt": value } }),
            Filter::Gte(field, value) => json!({ field: { "$gte": value } }),
            Filter::Lt(field, value) => json!({ field: { "$lt": value } }),
            Filter::Lte(field, value) => json!({ field: { "$lte": value } }),
            Filter::StartsWith(field, prefix) => {
                json!({ field: { "$regex": format!("^{}", escape_regex(prefix)) } })
            }
            Filter::Contains(field, needle) => {
                json!({ field: { "$regex": escape_regex(needle) } })
            }
            Filter::Exists(field, present) => json!({ field: { "$exists": present } }),
            Filter::In(field, values) => json!({ field: { "$in": values } }),
            Filter::And(children) => {
                let parts = children
                    .iter()
                    .map(Self::filter_to_value)
                    .collect::<FilterResult<Vec<Value>>>()?;
                json!({ "$and": parts })
            }
            Filter::Or(children) => {
                let parts = children
                    .iter()
                    .map(Self::filter_to_value)
                    .collect::<FilterResult<Vec<Value>>>()?;
                json!({ "$or": parts })
            }
        };
        Ok(value)
    }
}

impl FilterTranslator for MongoTranslator {
    fn translate(&self, query: &Query) -> FilterResult<String> {
        let value = match &query.filter {
            Some(filter) => Self::filter_to_value(filter)?,
            None => Value::Object(Map::new()),
        };
        // serde_json maps serialize with sorted keys, so equal filters
        // always produce identical strings.
        Ok(value.to_string())
    }

    fn fingerprint(&self, collection: &str, query: &Query) -> String {
        let filter = query
            .filter
            .as_ref()
            .and_then(|f| Self::filter_to_value(f).ok())
            .unwrap_or_else(|| Value::Object(Map::new()));

        let mut shape = Map::new();
        shape.insert("filter".into(), filter);
        if let Some(skip) = query.skip {
            shape.insert("skip".into(), json!(skip));
        }
        if let Some(limit) = query.limit {
            shape.insert("limit".into(), json!(limit));
        }
        if let Some((field, order)) = &query.sort {
            let dir = match order {
                SortOrder::Ascending => 1,
                SortOrder::Descending => -1,
            };
            shape.insert("sort".into(), json!({ field: dir }));
        }

        format!("{}:{}", collection, Value::Object(shape))
    }
}

/// Escapes regex metacharacters so prefix/substring predicates match
/// literally.
fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(
            c,
            '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
