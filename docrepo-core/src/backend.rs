//! Storage backend abstraction for the document repository.
//!
//! The repository never talks to a driver directly. It composes store-native
//! filter documents and hands them to a [`StoreBackend`], which executes them
//! against a named collection.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The operations a document store must support
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use docrepo::backend::StoreBackend;
//! use bson::doc;
//!
//! let id = backend.insert_document(doc! { "name": "Alice" }, "users").await?;
//! let found = backend.find_one(doc! { "_id": id }, "users").await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Document, oid::ObjectId};
use std::fmt::Debug;

use crate::{error::RepositoryResult, query::FindRequest};

/// Abstract interface for document storage backends.
///
/// Filters passed to every method are Mongo-shaped documents:
/// `{field: {"$op": value}}` entries combined by conjunction, with `$and`,
/// `$or` and `$nor` accepted at the top level.
///
/// # Thread Safety
///
/// Implementations must be safe to call concurrently from multiple tasks.
/// Each method is a single store call; no method retries on failure.
///
/// # Error Handling
///
/// Connectivity and driver failures are reported as
/// [`RepositoryError::Backend`](crate::error::RepositoryError::Backend), never
/// swallowed.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts one document and returns the identifier it is stored under.
    ///
    /// A document without an `_id` is assigned a fresh `ObjectId`.
    async fn insert_document(
        &self,
        document: Document,
        collection: &str,
    ) -> RepositoryResult<ObjectId>;

    /// Returns the documents matching `request.filter`, ordered, paginated and
    /// projected as the request describes.
    ///
    /// With an empty sort the order is store-defined and not stable across calls.
    /// A projection always keeps `_id`.
    async fn find_documents(
        &self,
        request: FindRequest,
        collection: &str,
    ) -> RepositoryResult<Vec<Document>>;

    /// Returns the first document matching `filter`, if any.
    async fn find_one(
        &self,
        filter: Document,
        collection: &str,
    ) -> RepositoryResult<Option<Document>>;

    /// Applies `set` as a partial field update to the first document matching
    /// `filter`, in a single atomic store call.
    ///
    /// Returns the document as it is after the update, or `None` when nothing
    /// matched.
    async fn find_one_and_update(
        &self,
        filter: Document,
        set: Document,
        collection: &str,
    ) -> RepositoryResult<Option<Document>>;

    /// Permanently removes the first document matching `filter`.
    ///
    /// Returns the number of documents removed (`0` or `1`).
    async fn delete_one(&self, filter: Document, collection: &str) -> RepositoryResult<u64>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op, but backends with external
    /// connections should override this.
    async fn shutdown(self) -> RepositoryResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn insert_document(
        &self,
        document: Document,
        collection: &str,
    ) -> RepositoryResult<ObjectId> {
        (*self)
            .insert_document(document, collection)
            .await
    }

    async fn find_documents(
        &self,
        request: FindRequest,
        collection: &str,
    ) -> RepositoryResult<Vec<Document>> {
        (*self)
            .find_documents(request, collection)
            .await
    }

    async fn find_one(
        &self,
        filter: Document,
        collection: &str,
    ) -> RepositoryResult<Option<Document>> {
        (*self)
            .find_one(filter, collection)
            .await
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        set: Document,
        collection: &str,
    ) -> RepositoryResult<Option<Document>> {
        (*self)
            .find_one_and_update(filter, set, collection)
            .await
    }

    async fn delete_one(&self, filter: Document, collection: &str) -> RepositoryResult<u64> {
        (*self)
            .delete_one(filter, collection)
            .await
    }
}

/// Factory trait for building backend instances.
///
/// Builders carry connection settings and perform any asynchronous setup the
/// backend needs before it can serve requests.
#[async_trait]
pub trait StoreBackendBuilder: Send {
    /// The backend type produced by this builder.
    type Backend: StoreBackend;

    /// Builds the backend.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Initialization`](crate::error::RepositoryError::Initialization)
    /// if the backend cannot be set up.
    async fn build(self) -> RepositoryResult<Self::Backend>;
}
