//! CRUD and query operations over one collection, with soft-delete visibility.
//!
//! A [`DocumentRepository`] is bound for its lifetime to a model name (used in
//! logs and errors), a [`DocumentSchema`] used to validate writes, and a
//! collection name.
//!
//! Records carrying a date-typed `deleted_at` are soft-deleted: reads skip them
//! unless asked to include deleted records, and updates and deletes do not see
//! them by default. A hard delete removes the record from the store outright.
//!
//! Updates, soft deletes and restores are each a single filtered store-level
//! modification, so a concurrent delete between lookup and write cannot be
//! missed. Two concurrent updates to the same record still resolve as
//! last-write-wins per field.
//!
//! # Example
//!
//! ```ignore
//! use docrepo::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let exams = store.repository("Exam", DocumentSchema::permissive("ExamDocument"), "exams");
//!
//! let created = exams.create(doc! { "name": "Pop Quiz", "score": 99 }).await?;
//! exams.update(created.id(), doc! { "score": 22 }, false).await?;
//! exams.delete(created.id(), false).await?;
//! ```

use bson::{Bson, DateTime, Document, doc, ser::serialize_to_bson};
use serde::Serialize;

use crate::{
    backend::StoreBackend,
    error::{RepositoryError, RepositoryResult},
    identifier::Identifier,
    normalize::STORE_ID_FIELD,
    options::QueryOptions,
    query::FindRequest,
    record::Record,
    schema::{DELETED_AT_FIELD, DocumentSchema},
};

/// The predicate a live record's `deleted_at` satisfies: absent, or not a date.
pub fn live_predicate() -> Document {
    doc! { "$not": { "$type": "date" } }
}

/// Restricts `filter` to live records unless `include_deleted` is set.
///
/// A caller filter that already constrains `deleted_at` is kept and combined
/// with the visibility predicate through `$and`.
pub fn apply_visibility(mut filter: Document, include_deleted: bool) -> Document {
    if include_deleted {
        return filter;
    }

    if filter.contains_key(DELETED_AT_FIELD) {
        doc! {
            "$and": [
                filter,
                { DELETED_AT_FIELD: live_predicate() },
            ]
        }
    } else {
        filter.insert(DELETED_AT_FIELD, live_predicate());
        filter
    }
}

#[derive(Debug)]
pub struct DocumentRepository<'a, B: StoreBackend> {
    backend: &'a B,
    model: String,
    schema: DocumentSchema,
    collection: String,
}

impl<'a, B: StoreBackend> DocumentRepository<'a, B> {
    pub fn new(
        backend: &'a B,
        model: impl Into<String>,
        schema: DocumentSchema,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            schema,
            collection: collection.into(),
        }
    }

    /// The model name this repository reports in logs and errors.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn schema(&self) -> &DocumentSchema {
        &self.schema
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Validates `data` against the bound schema and inserts it.
    ///
    /// Returns the stored record, including its store-assigned identifier and
    /// any defaults the schema filled in.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Validation`] if `data` violates the schema or carries
    /// its own `_id`; [`RepositoryError::Backend`] if the insert fails.
    pub async fn create(&self, data: Document) -> RepositoryResult<Record> {
        tracing::info!(
            model = %self.model,
            collection = %self.collection,
            document = %self.schema.name,
            "creating new record"
        );
        tracing::debug!(data = %data, "create data");

        if data.contains_key(STORE_ID_FIELD) {
            return Err(RepositoryError::Validation(
                "identifiers are assigned by the store".to_string(),
            ));
        }
        let data = self.schema.validate(data)?;

        let id = self.backend
            .insert_document(data.clone(), &self.collection)
            .await?;
        tracing::debug!(id = %id, "saved record");

        Ok(Record::new(id, data))
    }

    /// Serializes `value` and creates a record from it.
    pub async fn create_from<T: Serialize>(&self, value: &T) -> RepositoryResult<Record> {
        match serialize_to_bson(value)? {
            Bson::Document(data) => self.create(data).await,
            other => Err(RepositoryError::Serialization(format!(
                "expected a document, got {:?}",
                other.element_type(),
            ))),
        }
    }

    /// Fetches a single record by identifier.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] if no record has this identifier, or it is
    /// soft-deleted and `include_deleted` is false.
    pub async fn get(&self, id: impl Identifier, include_deleted: bool) -> RepositoryResult<Record> {
        let id = id.to_object_id()?;
        let filter = apply_visibility(doc! { STORE_ID_FIELD: id }, include_deleted);

        tracing::info!(model = %self.model, id = %id, include_deleted, "fetching record");
        tracing::debug!(filter = %filter, "get filter");

        match self.backend.find_one(filter, &self.collection).await? {
            Some(document) => Record::from_document(document),
            None => Err(RepositoryError::not_found(&self.model, id)),
        }
    }

    /// Finds all records matching `options`.
    ///
    /// An empty result is `Ok(vec![])`, never an error. The caller's options are
    /// not modified. Stored documents whose `_id` is not an `ObjectId`, such as
    /// ones written by other clients, are skipped with a warning.
    pub async fn query(
        &self,
        options: &QueryOptions,
        include_deleted: bool,
    ) -> RepositoryResult<Vec<Record>> {
        let request = FindRequest {
            filter: apply_visibility(options.filters.clone(), include_deleted),
            sort: options.sort.clone(),
            skip: options.skip,
            limit: options.effective_limit(),
            projection: options.projection.clone(),
        };

        tracing::info!(
            model = %self.model,
            collection = %self.collection,
            filter = %request.filter,
            "searching for records"
        );
        tracing::debug!(options = ?options, "query options");

        let documents = self.backend
            .find_documents(request, &self.collection)
            .await?;

        let mut records = Vec::with_capacity(documents.len());
        for document in documents {
            match Record::from_document(document) {
                Ok(record) => records.push(record),
                Err(err) => tracing::warn!(
                    model = %self.model,
                    collection = %self.collection,
                    error = %err,
                    "skipping stored document without an ObjectId identifier"
                ),
            }
        }
        tracing::debug!(count = records.len(), "query results");

        Ok(records)
    }

    /// Changes the listed fields of a record, leaving all others as they were.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] under the same visibility rules as
    /// [`get`](Self::get); [`RepositoryError::Validation`] if a change violates
    /// the schema or touches `_id`.
    pub async fn update(
        &self,
        id: impl Identifier,
        fields: Document,
        include_deleted: bool,
    ) -> RepositoryResult<Record> {
        let id = id.to_object_id()?;

        if fields.contains_key(STORE_ID_FIELD) {
            return Err(RepositoryError::Validation(
                "the identifier of a record cannot be changed".to_string(),
            ));
        }
        self.schema.validate_partial(&fields)?;

        if fields.is_empty() {
            return self.get(id, include_deleted).await;
        }

        let filter = apply_visibility(doc! { STORE_ID_FIELD: id }, include_deleted);
        tracing::info!(model = %self.model, id = %id, "updating record");
        tracing::debug!(filter = %filter, set = %fields, "update");

        match self.backend
            .find_one_and_update(filter, fields, &self.collection)
            .await?
        {
            Some(document) => Record::from_document(document),
            None => Err(RepositoryError::not_found(&self.model, id)),
        }
    }

    /// Deletes a live record.
    ///
    /// By default the record is soft-deleted by stamping `deleted_at` with the
    /// current UTC time. With `hard` set it is removed from the store
    /// permanently. Returns `true` once the store reports the change.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] if no live record has this identifier,
    /// including one that is already soft-deleted.
    pub async fn delete(&self, id: impl Identifier, hard: bool) -> RepositoryResult<bool> {
        let id = id.to_object_id()?;
        let filter = apply_visibility(doc! { STORE_ID_FIELD: id }, false);
        tracing::debug!(filter = %filter, "delete filter");

        if hard {
            tracing::info!(model = %self.model, id = %id, "deleting record");

            return match self.backend.delete_one(filter, &self.collection).await? {
                0 => Err(RepositoryError::not_found(&self.model, id)),
                _ => Ok(true),
            };
        }

        tracing::info!(model = %self.model, id = %id, "marking record deleted");
        let set = doc! { DELETED_AT_FIELD: DateTime::now() };

        match self.backend
            .find_one_and_update(filter, set, &self.collection)
            .await?
        {
            Some(_) => Ok(true),
            None => Err(RepositoryError::not_found(&self.model, id)),
        }
    }

    /// Brings a soft-deleted record back into default visibility.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] if there is no soft-deleted record with
    /// this identifier.
    pub async fn restore(&self, id: impl Identifier) -> RepositoryResult<Record> {
        let id = id.to_object_id()?;
        let filter = doc! {
            STORE_ID_FIELD: id,
            DELETED_AT_FIELD: { "$type": "date" },
        };
        tracing::info!(model = %self.model, id = %id, "restoring record");

        match self.backend
            .find_one_and_update(filter, doc! { DELETED_AT_FIELD: Bson::Null }, &self.collection)
            .await?
        {
            Some(document) => Record::from_document(document),
            None => Err(RepositoryError::not_found(&self.model, id)),
        }
    }
}
