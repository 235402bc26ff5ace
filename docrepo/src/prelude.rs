//! Convenient re-exports of commonly used types from docrepo.
//!
//! ```ignore
//! use docrepo::prelude::*;
//! ```

pub use docrepo_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{RepositoryError, RepositoryResult},
    identifier::Identifier,
    options::{FilterDescriptor, QueryOptions, SortDescriptor},
    query::{FilterOperator, FindRequest, Sort, SortDirection},
    record::{FieldValue, Record},
    repository::DocumentRepository,
    schema::{DocumentSchema, FieldDef, FieldType},
    store::DocumentStore,
};
