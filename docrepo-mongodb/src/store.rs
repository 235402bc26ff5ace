use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Bson, Document, doc, oid::ObjectId};
use mongodb::{
    Client, Collection as MongoCollection,
    options::{ClientOptions, FindOptions, ReturnDocument},
};
use docrepo_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{RepositoryError, RepositoryResult},
    normalize::STORE_ID_FIELD,
    query::FindRequest,
};


#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    fn find_options(request: &FindRequest) -> FindOptions {
        let mut options = FindOptions::default();

        options.sort = request.sort_document();
        options.projection = request.projection_document();
        options.limit = request.limit
            .filter(|limit| *limit > 0)
            .map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));

        if request.skip > 0 {
            options.skip = Some(request.skip);
        }

        options
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_document(&self, document: Document, collection: &str) -> RepositoryResult<ObjectId> {
        let result = self.get_collection(collection)
            .insert_one(document)
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;

        match result.inserted_id {
            Bson::ObjectId(id) => Ok(id),
            other => Err(RepositoryError::Backend(format!(
                "expected an ObjectId {}, got {}",
                STORE_ID_FIELD,
                other,
            ))),
        }
    }

    async fn find_documents(&self, request: FindRequest, collection: &str) -> RepositoryResult<Vec<Document>> {
        let options = Self::find_options(&request);

        self.get_collection(collection)
            .find(request.filter)
            .with_options(options)
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))
    }

    async fn find_one(&self, filter: Document, collection: &str) -> RepositoryResult<Option<Document>> {
        self.get_collection(collection)
            .find_one(filter)
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        set: Document,
        collection: &str,
    ) -> RepositoryResult<Option<Document>> {
        self.get_collection(collection)
            .find_one_and_update(filter, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))
    }

    async fn delete_one(&self, filter: Document, collection: &str) -> RepositoryResult<u64> {
        Ok(
            self.get_collection(collection)
                .delete_one(filter)
                .await
                .map_err(|e| RepositoryError::Backend(e.to_string()))?
                .deleted_count
        )
    }

    async fn shutdown(self) -> RepositoryResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> RepositoryResult<Self::Backend> {
        tracing::info!(database = %self.database, "connecting to mongodb");

        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| RepositoryError::Initialization(e.to_string()))?,
            )
            .map_err(|e| RepositoryError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
