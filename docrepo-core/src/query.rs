//! Store-native query primitives.
//!
//! This module holds the pieces a backend needs to execute a find: the filter
//! operator vocabulary, sort specifications, and the [`FindRequest`] that the
//! repository hands to a [`StoreBackend`](crate::backend::StoreBackend).
//!
//! Filters are Mongo-shaped BSON documents (`{field: {"$op": value}}`), so a
//! backend either forwards them verbatim or evaluates them itself.
//!
//! # Example
//!
//! ```ignore
//! use docrepo::query::{FindRequest, SortDirection};
//! use bson::doc;
//!
//! let request = FindRequest::builder()
//!     .filter(doc! { "score": { "$gte": 50 } })
//!     .sort("score", SortDirection::Desc)
//!     .limit(10)
//!     .build();
//! ```

use bson::{Bson, Document, doc};
use std::fmt;

use crate::error::{RepositoryError, RepositoryResult};

/// Querystring operator tokens that have no store mapping.
///
/// Pattern matching (`like`, `startswith`, ...), range membership (`between`)
/// and boolean combinators (`and`, `or`, `nor`) are not translated. The lenient
/// resolver downgrades them to equality and logs a warning; the strict resolver
/// rejects them.
pub const UNSUPPORTED_OPERATOR_TOKENS: [&str; 13] = [
    "like",
    "ilike",
    "notlike",
    "notilike",
    "startswith",
    "endswith",
    "match",
    "has",
    "any",
    "between",
    "and",
    "or",
    "nor",
];

/// Store predicate operators reachable from querystring tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    /// `eq` → equals.
    Eq,
    /// `gt` → greater than.
    Gt,
    /// `ge` → greater than or equal.
    Gte,
    /// `in_` → membership in a set.
    In,
    /// `lt` → less than.
    Lt,
    /// `le` → less than or equal.
    Lte,
    /// `ne` → not equal.
    Ne,
    /// `notin_` → not a member of a set.
    NotIn,
    /// `isnot` → logical-not wrapper around an operator expression.
    Not,
    /// `is_` → field existence check.
    Exists,
}

impl FilterOperator {
    /// Resolves a querystring token, defaulting to [`FilterOperator::Eq`] for
    /// anything unrecognized.
    pub fn from_token(token: &str) -> Self {
        match Self::lookup(token) {
            Some(op) => op,
            None => {
                if Self::is_unsupported(token) {
                    tracing::warn!(token, "unsupported filter operator, falling back to equality");
                }
                FilterOperator::Eq
            }
        }
    }

    /// Resolves a querystring token, rejecting unknown and unsupported tokens.
    pub fn try_from_token(token: &str) -> RepositoryResult<Self> {
        Self::lookup(token).ok_or_else(|| RepositoryError::UnsupportedOperator(token.to_string()))
    }

    /// Returns `true` if the token names an operator that is deliberately not translated.
    pub fn is_unsupported(token: &str) -> bool {
        UNSUPPORTED_OPERATOR_TOKENS.contains(&token)
    }

    /// The store predicate symbol for this operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "$eq",
            FilterOperator::Gt => "$gt",
            FilterOperator::Gte => "$gte",
            FilterOperator::In => "$in",
            FilterOperator::Lt => "$lt",
            FilterOperator::Lte => "$lte",
            FilterOperator::Ne => "$ne",
            FilterOperator::NotIn => "$nin",
            FilterOperator::Not => "$not",
            FilterOperator::Exists => "$exists",
        }
    }

    /// Builds the single-key predicate document `{symbol: value}`.
    pub fn predicate(&self, value: impl Into<Bson>) -> Document {
        let value: Bson = value.into();
        doc! { self.symbol(): value }
    }

    fn lookup(token: &str) -> Option<Self> {
        Some(match token {
            "eq" => FilterOperator::Eq,
            "gt" => FilterOperator::Gt,
            "ge" => FilterOperator::Gte,
            "in_" => FilterOperator::In,
            "lt" => FilterOperator::Lt,
            "le" => FilterOperator::Lte,
            "ne" => FilterOperator::Ne,
            "notin_" => FilterOperator::NotIn,
            "isnot" => FilterOperator::Not,
            "is_" => FilterOperator::Exists,
            _ => return None,
        })
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    #[default]
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    /// Resolves a querystring order token: `asc` and `dsc`, anything else is ascending.
    pub fn from_token(token: &str) -> Self {
        match token {
            "dsc" => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    /// The numeric store encoding, `1` or `-1`.
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

impl From<i32> for SortDirection {
    fn from(value: i32) -> Self {
        if value < 0 {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

/// Sort specification for one key of a multi-key ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl Sort {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self { field: field.into(), direction }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

impl<S: Into<String>> From<(S, i32)> for Sort {
    fn from((field, direction): (S, i32)) -> Self {
        Sort::new(field, SortDirection::from(direction))
    }
}

impl<S: Into<String>> From<(S, SortDirection)> for Sort {
    fn from((field, direction): (S, SortDirection)) -> Self {
        Sort::new(field, direction)
    }
}

/// A fully composed find against one collection.
///
/// The repository builds this after merging the soft-delete predicate into the
/// caller's filters; backends execute it as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindRequest {
    /// Store-native filter document.
    pub filter: Document,
    /// Ordered sort keys, primary first.
    pub sort: Vec<Sort>,
    /// Number of matching documents to skip.
    pub skip: u64,
    /// Maximum number of documents to return, `None` for unbounded. Backends
    /// also treat `Some(0)` as unbounded.
    pub limit: Option<u64>,
    /// Fields to include. Empty means all fields.
    pub projection: Vec<String>,
}

impl FindRequest {
    pub fn new(filter: Document) -> Self {
        Self { filter, ..Default::default() }
    }

    pub fn builder() -> FindRequestBuilder {
        FindRequestBuilder::new()
    }

    /// The ordered sort document, `{field: 1 | -1, ...}`, or `None` when unsorted.
    pub fn sort_document(&self) -> Option<Document> {
        if self.sort.is_empty() {
            return None;
        }

        Some(
            self.sort
                .iter()
                .map(|sort| (sort.field.clone(), Bson::Int32(sort.direction.as_i32())))
                .collect()
        )
    }

    /// The inclusion projection document, `{field: 1, ...}`, or `None` for all fields.
    pub fn projection_document(&self) -> Option<Document> {
        if self.projection.is_empty() {
            return None;
        }

        Some(
            self.projection
                .iter()
                .map(|field| (field.clone(), Bson::Int32(1)))
                .collect()
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct FindRequestBuilder {
    request: FindRequest,
}

impl FindRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Document) -> Self {
        self.request.filter = filter;
        self
    }

    /// Appends a sort key after any already present.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.request.sort.push(Sort::new(field, direction));
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.request.skip = skip;
        self
    }

    /// Caps the result count. `0` means unbounded.
    pub fn limit(mut self, limit: u64) -> Self {
        self.request.limit = (limit > 0).then_some(limit);
        self
    }

    pub fn projection<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request.projection = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> FindRequest {
        self.request
    }
}
