//! The document store owning a backend and handing out repositories.
//!
//! # Example
//!
//! ```ignore
//! use docrepo::store::DocumentStore;
//! use docrepo::schema::DocumentSchema;
//!
//! let store = DocumentStore::new(backend);
//! let exams = store.repository("Exam", DocumentSchema::permissive("ExamDocument"), "exams");
//! ```

use crate::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::RepositoryResult,
    repository::DocumentRepository,
    schema::DocumentSchema,
};

/// A document store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Builds the backend from `builder` and wraps it in a store.
    pub async fn connect<T>(builder: T) -> RepositoryResult<Self>
    where
        T: StoreBackendBuilder<Backend = B>,
    {
        Ok(Self::new(builder.build().await?))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets a repository over `collection`, validating writes against `schema`
    /// and reporting itself as `model` in logs and errors.
    pub fn repository<'a>(
        &'a self,
        model: &str,
        schema: DocumentSchema,
        collection: &str,
    ) -> DocumentRepository<'a, B> {
        DocumentRepository::new(&self.backend, model, schema, collection)
    }

    /// Shuts down the document store and its backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown operation fails.
    pub async fn shutdown(self) -> RepositoryResult<()> {
        self.backend.shutdown().await?;

        Ok(())
    }
}
