//! In-memory storage implementation for document stores.
//!
//! This module provides a simple backend that keeps documents in per-collection
//! maps guarded by an async-aware read-write lock.

use std::{cmp::Ordering, collections::{BTreeMap, HashMap}, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document, oid::ObjectId};

use docrepo_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{RepositoryError, RepositoryResult},
    normalize::STORE_ID_FIELD,
    query::{FindRequest, Sort, SortDirection},
};

use crate::evaluator::{Comparable, DocumentEvaluator};

type CollectionMap = BTreeMap<ObjectId, Document>;
type StoreMap = HashMap<String, CollectionMap>;


/// Thread-safe in-memory document storage backend.
///
/// Documents are keyed by their `ObjectId`, so an unsorted scan returns them
/// in identifier order, which for store-assigned identifiers is insertion order.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data. Every modification holds the write lock for
/// its whole match-and-write, so each is atomic with respect to other calls.
///
/// # Performance
///
/// Queries scan all documents in a collection (no indexing).
///
/// # Example
///
/// ```ignore
/// use docrepo_memory::InMemoryStore;
/// use docrepo::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let id = store.insert_document(doc! { "name": "Alice", "age": 30 }, "users").await?;
/// let found = store.find_one(doc! { "_id": id }, "users").await?;
/// assert!(found.is_some());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection_name -> (document_id -> document)
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Number of documents currently held in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(collection)
            .map(|documents| documents.len())
            .unwrap_or(0)
    }
}

/// The key of the first document in `collection_map` matching `filter`.
fn first_match(collection_map: &CollectionMap, filter: &Document) -> RepositoryResult<Option<ObjectId>> {
    for (id, document) in collection_map {
        if DocumentEvaluator::new(document).evaluate(filter)? {
            return Ok(Some(*id));
        }
    }

    Ok(None)
}

fn compare_by(sort: &[Sort], a: &Document, b: &Document) -> Ordering {
    for key in sort {
        let left = a
            .get(&key.field)
            .map(Comparable::from)
            .unwrap_or(Comparable::Null);
        let right = b
            .get(&key.field)
            .map(Comparable::from)
            .unwrap_or(Comparable::Null);

        let ordering = match key.direction {
            SortDirection::Asc => left.sort_cmp(&right),
            SortDirection::Desc => right.sort_cmp(&left),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

fn project(document: &Document, fields: &[String]) -> Document {
    if fields.is_empty() {
        return document.clone();
    }

    let mut projected = Document::new();

    if let Some(id) = document.get(STORE_ID_FIELD) {
        projected.insert(STORE_ID_FIELD, id.clone());
    }

    for field in fields {
        if let Some(value) = document.get(field) {
            projected.insert(field.clone(), value.clone());
        }
    }

    projected
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_document(&self, mut document: Document, collection: &str) -> RepositoryResult<ObjectId> {
        let id = match document.get(STORE_ID_FIELD) {
            Some(Bson::ObjectId(id)) => *id,
            Some(other) => {
                return Err(RepositoryError::Backend(format!(
                    "in-memory documents must be keyed by an ObjectId, got {:?}",
                    other.element_type(),
                )));
            },
            None => {
                let id = ObjectId::new();
                document.insert(STORE_ID_FIELD, id);
                id
            },
        };

        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.to_string())
            .or_default();

        if collection_map.contains_key(&id) {
            return Err(RepositoryError::Backend(format!(
                "document {} already exists in collection {}",
                id,
                collection,
            )));
        }

        collection_map.insert(id, document);
        tracing::trace!(collection, id = %id, "inserted document");

        Ok(id)
    }

    async fn find_documents(&self, request: FindRequest, collection: &str) -> RepositoryResult<Vec<Document>> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        let mut matched = DocumentEvaluator::filter_documents(
            collection_map.values(),
            &request.filter,
        )?;

        if !request.sort.is_empty() {
            matched.sort_by(|a, b| compare_by(&request.sort, a, b));
        }

        let skip = usize::try_from(request.skip).unwrap_or(usize::MAX);
        let limit = request.limit
            .filter(|limit| *limit > 0)
            .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        Ok(
            matched
                .into_iter()
                .skip(skip)
                .take(limit)
                .map(|document| project(document, &request.projection))
                .collect()
        )
    }

    async fn find_one(&self, filter: Document, collection: &str) -> RepositoryResult<Option<Document>> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(None),
        };

        Ok(
            first_match(collection_map, &filter)?
                .and_then(|id| collection_map.get(&id))
                .cloned()
        )
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        set: Document,
        collection: &str,
    ) -> RepositoryResult<Option<Document>> {
        let mut store = self.store.write().await;
        let collection_map = match store.get_mut(collection) {
            Some(col) => col,
            None => return Ok(None),
        };

        let Some(id) = first_match(collection_map, &filter)? else {
            return Ok(None);
        };
        let Some(document) = collection_map.get_mut(&id) else {
            return Ok(None);
        };

        for (field, value) in set {
            document.insert(field, value);
        }
        tracing::trace!(collection, id = %id, "updated document");

        Ok(Some(document.clone()))
    }

    async fn delete_one(&self, filter: Document, collection: &str) -> RepositoryResult<u64> {
        let mut store = self.store.write().await;
        let collection_map = match store.get_mut(collection) {
            Some(col) => col,
            None => return Ok(0),
        };

        match first_match(collection_map, &filter)? {
            Some(id) => {
                collection_map.remove(&id);
                tracing::trace!(collection, id = %id, "removed document");

                Ok(1)
            },
            None => Ok(0),
        }
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> RepositoryResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();

        for score in [20, 30, 10] {
            store
                .insert_document(doc! { "name": format!("exam-{}", score), "score": score }, "exams")
                .await
                .unwrap();
        }

        store
    }

    #[tokio::test]
    async fn insert_assigns_identifiers() {
        let store = InMemoryStore::new();
        let id = store.insert_document(doc! { "name": "a" }, "exams").await.unwrap();

        let found = store.find_one(doc! { "_id": id }, "exams").await.unwrap().unwrap();
        assert_eq!(found.get_object_id("_id").unwrap(), id);
        assert_eq!(store.count("exams").await, 1);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_identifiers() {
        let store = InMemoryStore::new();
        let id = ObjectId::new();

        store.insert_document(doc! { "_id": id }, "exams").await.unwrap();
        assert!(store.insert_document(doc! { "_id": id }, "exams").await.is_err());
    }

    #[tokio::test]
    async fn find_sorts_skips_and_limits() {
        let store = seeded().await;

        let request = FindRequest::builder()
            .sort("score", SortDirection::Desc)
            .skip(1)
            .limit(1)
            .build();
        let found = store.find_documents(request, "exams").await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get_i32("score").unwrap(), 20);
    }

    #[tokio::test]
    async fn find_without_sort_keeps_insertion_order() {
        let store = seeded().await;

        let found = store.find_documents(FindRequest::default(), "exams").await.unwrap();
        let scores = found
            .iter()
            .map(|document| document.get_i32("score").unwrap())
            .collect::<Vec<_>>();

        assert_eq!(scores, vec![20, 30, 10]);
    }

    #[tokio::test]
    async fn zero_limit_is_unbounded() {
        let store = seeded().await;

        let built = FindRequest::builder().limit(0).build();
        assert_eq!(built.limit, None);
        assert_eq!(store.find_documents(built, "exams").await.unwrap().len(), 3);

        let raw = FindRequest { limit: Some(0), ..Default::default() };
        assert_eq!(store.find_documents(raw, "exams").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn projection_keeps_identifier() {
        let store = seeded().await;

        let request = FindRequest::builder()
            .projection(["score"])
            .build();
        let found = store.find_documents(request, "exams").await.unwrap();

        for document in found {
            assert!(document.contains_key("_id"));
            assert!(document.contains_key("score"));
            assert!(!document.contains_key("name"));
        }
    }

    #[tokio::test]
    async fn update_sets_only_listed_fields() {
        let store = seeded().await;

        let updated = store
            .find_one_and_update(doc! { "score": 20 }, doc! { "score": 22 }, "exams")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.get_i32("score").unwrap(), 22);
        assert_eq!(updated.get_str("name").unwrap(), "exam-20");
    }

    #[tokio::test]
    async fn missing_collections_are_empty() {
        let store = InMemoryStore::new();

        assert!(store.find_one(doc! {}, "nothing").await.unwrap().is_none());
        assert_eq!(store.delete_one(doc! {}, "nothing").await.unwrap(), 0);
        assert!(
            store
                .find_one_and_update(doc! {}, doc! { "a": 1 }, "nothing")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn delete_removes_one_match() {
        let store = seeded().await;

        assert_eq!(store.delete_one(doc! { "score": { "$gte": 20 } }, "exams").await.unwrap(), 1);
        assert_eq!(store.count("exams").await, 2);
    }
}
