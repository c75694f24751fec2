//! Filter AST and query shaping.

use serde_json::Value;

/// A backend-agnostic filter predicate over JSON documents.
///
/// Filters are built with the constructor methods and combined with
/// [`Filter::and`] / [`Filter::or`]. The local cache evaluates them
/// directly; network backends translate them through a
/// [`crate::FilterTranslator`].
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals value.
    Eq(String, Value),
    /// Field does not equal value.
    Ne(String, Value),
    /// Field is strictly greater than value.
    Gt(String, Value),
    /// Field is greater than or equal to value.
    Gte(String, Value),
    /// Field is strictly less than value.
    Lt(String, Value),
    /// Field is less than or equal to value.
    Lte(String, Value),
    /// String field starts with the given prefix.
    StartsWith(String, String),
    /// String field contains the given substring.
    Contains(String, String),
    /// Field presence test.
    Exists(String, bool),
    /// Field value is a member of the given set.
    In(String, Vec<Value>),
    /// All sub-filters must match.
    And(Vec<Filter>),
    /// At least one sub-filter must match.
    Or(Vec<Filter>),
}

impl Filter {
    /// Field-equals-value predicate.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    /// Field-not-equals-value predicate.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Ne(field.into(), value.into())
    }

    /// Strictly-greater-than predicate.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gt(field.into(), value.into())
    }

    /// Greater-than-or-equal predicate.
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gte(field.into(), value.into())
    }

    /// Strictly-less-than predicate.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lt(field.into(), value.into())
    }

    /// Less-than-or-equal predicate.
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lte(field.into(), value.into())
    }

    /// String-prefix predicate.
    pub fn starts_with(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::StartsWith(field.into(), prefix.into())
    }

    /// Substring predicate.
    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::Contains(field.into(), needle.into())
    }

    /// Field-presence predicate.
    pub fn exists(field: impl Into<String>, present: bool) -> Self {
        Self::Exists(field.into(), present)
    }

    /// Set-membership predicate.
    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::In(field.into(), values)
    }

    /// Conjunction of filters.
    pub fn and(filters: Vec<Filter>) -> Self {
        Self::And(filters)
    }

    /// Disjunction of filters.
    pub fn or(filters: Vec<Filter>) -> Self {
        Self::Or(filters)
    }

    /// Returns true if the filter contains at least one concrete predicate.
    ///
    /// An `And`/`Or` with no children (or only empty children) has nothing
    /// to evaluate; operations that require a where clause reject such
    /// filters before any I/O.
    pub fn has_evaluable_clause(&self) -> bool {
        match self {
            Filter::And(children) | Filter::Or(children) => {
                children.iter().any(Filter::has_evaluable_clause)
            }
            _ => true,
        }
    }
}

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending field order.
    Ascending,
    /// Descending field order.
    Descending,
}

/// A query over a collection: an optional filter plus result shaping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    /// Filter predicate; `None` matches every record.
    pub filter: Option<Filter>,
    /// Number of records to skip.
    pub skip: Option<u64>,
    /// Maximum number of records to return.
    pub limit: Option<u64>,
    /// Sort field and direction.
    pub sort: Option<(String, SortOrder)>,
}

impl Query {
    /// Creates an unfiltered query matching all records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query with the given filter.
    pub fn filtered(filter: Filter) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    /// Sets the number of records to skip.
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Sets the maximum number of records to return.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the sort field and direction.
    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some((field.into(), order));
        self
    }

    /// Returns true if the query has no filter predicate.
    pub fn is_unfiltered(&self) -> bool {
        self.filter.is_none()
    }

    /// Returns true if the query's filter has at least one evaluable clause.
    pub fn has_evaluable_clause(&self) -> bool {
        self.filter
            .as_ref()
            .map(Filter::has_evaluable_clause)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn constructors_build_expected_variants() {
        assert_eq!(
            Filter::eq("name", "A"),
            Filter::Eq("name".into(), json!("A"))
        );
        assert_eq!(Filter::gt("age", 21), Filter::Gt("age".into(), json!(21)));
        assert_eq!(
            Filter::starts_with("name", "Al"),
            Filter::StartsWith("name".into(), "Al".into())
        );
    }

    #[test]
    fn empty_combinators_have_no_evaluable_clause() {
        assert!(!Filter::and(vec![]).has_evaluable_clause());
        assert!(!Filter::or(vec![]).has_evaluable_clause());
        assert!(!Filter::and(vec![Filter::or(vec![])]).has_evaluable_clause());

        assert!(Filter::and(vec![Filter::eq("a", 1)]).has_evaluable_clause());
        assert!(Filter::eq("a", 1).has_evaluable_clause());
    }

    #[test]
    fn unfiltered_query_has_no_evaluable_clause() {
        let query = Query::new();
        assert!(query.is_unfiltered());
        assert!(!query.has_evaluable_clause());

        let query = Query::filtered(Filter::eq("a", 1));
        assert!(query.has_evaluable_clause());
    }

    #[test]
    fn query_builder() {
        let query = Query::filtered(Filter::eq("kind", "todo"))
            .with_skip(10)
            .with_limit(5)
            .with_sort("name", SortOrder::Ascending);

        assert_eq!(query.skip, Some(10));
        assert_eq!(query.limit, Some(5));
        assert_eq!(query.sort, Some(("name".into(), SortOrder::Ascending)));
    }
}
