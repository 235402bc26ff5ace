//! Main docrepo crate providing a unified interface to soft-delete document repositories.
//!
//! This crate is the primary entry point for users of docrepo. It re-exports the
//! core types from the sub-crates and provides access to the storage backends.
//!
//! # Features
//!
//! - **Querystring translation** - Turn `(name, op, val)` filter triples, sort pairs and
//!   projections into store-native query options
//! - **Soft deletes** - Records stamped with `deleted_at` disappear from default reads
//!   and can be restored
//! - **Explicit field presence** - Projected-away fields read as `NotSet`, never as null
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docrepo::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::new());
//!     let exams = store.repository("Exam", DocumentSchema::permissive("ExamDocument"), "exams");
//!
//!     let quiz = exams.create(doc! { "name": "Pop Quiz", "score": 99 }).await?;
//!
//!     let mut options = QueryOptions::default();
//!     options.set_filters(None, Some(vec![FilterDescriptor::new("score", "gt", 50)]));
//!     options.set_sort(None, Some(vec![SortDescriptor::new("score", "dsc")]));
//!     let passed = exams.query(&options, false).await?;
//!     assert_eq!(passed.len(), 1);
//!
//!     exams.delete(quiz.id(), false).await?;
//!     assert!(exams.get(quiz.id(), false).await.is_err());
//!     assert!(exams.get(quiz.id(), true).await?.is_deleted());
//!
//!     store.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use docrepo_core::{
    backend, error, identifier, normalize, options, query, record, repository, schema, store,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docrepo_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docrepo_mongodb::{ConfigError, MongoDbConfig, MongoDbStore, MongoDbStoreBuilder};
}
