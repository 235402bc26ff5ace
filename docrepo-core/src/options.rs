//! Query options and querystring translation.
//!
//! [`QueryOptions`] describes a single query: filters, projection, pagination
//! and ordering. Each of the filter, projection and sort settings can be given
//! either as an already-structured value or as raw querystring descriptors
//! from an upstream request layer, which are translated here into the
//! store-native shape the repository consumes.
//!
//! # Example
//!
//! ```ignore
//! use docrepo::options::{QueryOptions, FilterDescriptor, SortDescriptor};
//!
//! let mut options = QueryOptions::default();
//! options.set_filters(None, Some(vec![FilterDescriptor::new("score", "ge", 50)]));
//! options.set_sort(None, Some(vec![SortDescriptor::new("score", "dsc")]));
//! options.limit = 20;
//! ```

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

use crate::{
    error::RepositoryResult,
    query::{FilterOperator, Sort, SortDirection},
};

/// A raw `{name, op, val}` filter triple as received from a querystring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDescriptor {
    /// Field the predicate applies to.
    pub name: String,
    /// Operator token, see [`FilterOperator::from_token`].
    pub op: String,
    /// Operand.
    pub val: Bson,
}

impl FilterDescriptor {
    pub fn new(name: impl Into<String>, op: impl Into<String>, val: impl Into<Bson>) -> Self {
        Self {
            name: name.into(),
            op: op.into(),
            val: val.into(),
        }
    }
}

/// A raw `{field, order}` sort pair as received from a querystring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDescriptor {
    pub field: String,
    /// `asc` or `dsc`; anything else sorts ascending.
    #[serde(default)]
    pub order: String,
}

impl SortDescriptor {
    pub fn new(field: impl Into<String>, order: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: order.into(),
        }
    }
}

impl From<&SortDescriptor> for Sort {
    fn from(descriptor: &SortDescriptor) -> Self {
        Sort::new(descriptor.field.clone(), SortDirection::from_token(&descriptor.order))
    }
}

/// Options describing one query.
///
/// Every instance owns its own containers; `Default` yields empty filters,
/// projection and sort, with `skip` and `limit` at zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Conjunction of per-field predicates, `{field: {"$op": value}}`.
    pub filters: Document,
    /// Fields to include in results. Empty means all fields.
    pub projection: Vec<String>,
    /// Pagination offset.
    pub skip: u64,
    /// Maximum result count. `0` means unbounded, not "return nothing".
    pub limit: u64,
    /// Ordered sort keys, primary first.
    pub sort: Vec<Sort>,
}

impl QueryOptions {
    pub fn new(
        filters: Document,
        projection: Vec<String>,
        skip: u64,
        limit: u64,
        sort: Vec<Sort>,
    ) -> Self {
        Self { filters, projection, skip, limit, sort }
    }

    /// The limit to hand to the store, `None` when unbounded.
    pub fn effective_limit(&self) -> Option<u64> {
        match self.limit {
            0 => None,
            limit => Some(limit),
        }
    }

    /// Sets filters for the query.
    ///
    /// An explicit document replaces the current filters verbatim. Otherwise
    /// querystring triples are translated into `{name: {symbol: val}}` entries;
    /// a later triple on the same field replaces an earlier one. With neither,
    /// the filters are left unchanged.
    pub fn set_filters(
        &mut self,
        filters: Option<Document>,
        from_querystring: Option<Vec<FilterDescriptor>>,
    ) {
        if let Some(filters) = filters {
            self.filters = filters;
        } else if let Some(descriptors) = from_querystring {
            self.filters = descriptors
                .into_iter()
                .map(|descriptor| {
                    let op = FilterOperator::from_token(&descriptor.op);
                    (descriptor.name, Bson::Document(op.predicate(descriptor.val)))
                })
                .collect();
        }
    }

    /// Like [`set_filters`](Self::set_filters), but unknown or unsupported
    /// operator tokens are an error and leave the filters untouched.
    pub fn try_set_filters(
        &mut self,
        filters: Option<Document>,
        from_querystring: Option<Vec<FilterDescriptor>>,
    ) -> RepositoryResult<()> {
        if let Some(filters) = filters {
            self.filters = filters;
        } else if let Some(descriptors) = from_querystring {
            self.filters = descriptors
                .into_iter()
                .map(|descriptor| {
                    FilterOperator::try_from_token(&descriptor.op)
                        .map(|op| (descriptor.name, Bson::Document(op.predicate(descriptor.val))))
                })
                .collect::<RepositoryResult<Document>>()?;
        }

        Ok(())
    }

    /// Sets the fields to include in results. Querystring projections are used as-is.
    pub fn set_projection(
        &mut self,
        projection: Option<Vec<String>>,
        from_querystring: Option<Vec<String>>,
    ) {
        if let Some(projection) = projection {
            self.projection = projection;
        } else if let Some(projection) = from_querystring {
            self.projection = projection;
        }
    }

    /// Sets the result ordering, preserving the order of the given keys.
    pub fn set_sort(
        &mut self,
        sort: Option<Vec<Sort>>,
        from_querystring: Option<Vec<SortDescriptor>>,
    ) {
        if let Some(sort) = sort {
            self.sort = sort;
        } else if let Some(descriptors) = from_querystring {
            self.sort = descriptors
                .iter()
                .map(Sort::from)
                .collect();
        }
    }
}
