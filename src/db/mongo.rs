//! MongoDB client and collection wrapper

use bson::{doc, oid::ObjectId, DateTime, Document};
use futures_util::{TryStream, TryStreamExt};
use mongodb::{
    options::{IndexOptions, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::db::schemas::Metadata;
use crate::types::PerkhubError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// Restrict a filter to documents that are not soft-deleted
fn live_filter(filter: Document) -> Document {
    let mut filter = filter;
    filter.insert("metadata.is_deleted", doc! { "$ne": true });
    filter
}

/// Drain a cursor, failing on the first document that cannot be read
async fn collect_all<S, T>(cursor: S) -> Result<Vec<T>, PerkhubError>
where
    S: TryStream<Ok = T>,
    S::Error: std::fmt::Display,
{
    cursor
        .try_collect()
        .await
        .map_err(|e| PerkhubError::Database(format!("Error reading document: {}", e)))
}

/// MongoDB client wrapper
///
/// Created once at start-up and shared by every store.
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and ping the database
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, PerkhubError> {
        info!("Connecting to MongoDB");

        // Fail fast instead of buffering commands against an unreachable server
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}/?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri.trim_end_matches('/'))
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| PerkhubError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| PerkhubError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection, applying its indexes
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, PerkhubError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, PerkhubError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), PerkhubError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| PerkhubError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, setting metadata timestamps
    ///
    /// Raw driver errors are returned so callers can detect unique index violations.
    pub async fn insert_one(&self, item: &mut T) -> Result<Option<ObjectId>, mongodb::error::Error> {
        let metadata = item.mut_metadata();
        let now = DateTime::now();
        metadata.is_deleted = false;
        metadata.created_at = Some(now);
        metadata.updated_at = Some(now);

        let result = self.inner.insert_one(&*item).await?;

        Ok(result.inserted_id.as_object_id())
    }

    /// Insert many documents, setting metadata timestamps
    pub async fn insert_many(&self, items: Vec<T>) -> Result<usize, PerkhubError> {
        if items.is_empty() {
            return Ok(0);
        }

        let now = DateTime::now();
        let items: Vec<T> = items
            .into_iter()
            .map(|mut item| {
                let metadata = item.mut_metadata();
                metadata.is_deleted = false;
                metadata.created_at = Some(now);
                metadata.updated_at = Some(now);
                item
            })
            .collect();

        let result = self
            .inner
            .insert_many(items)
            .await
            .map_err(|e| PerkhubError::Database(format!("Insert failed: {}", e)))?;

        Ok(result.inserted_ids.len())
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, PerkhubError> {
        self.inner
            .find_one(live_filter(filter))
            .await
            .map_err(|e| PerkhubError::Database(format!("Find failed: {}", e)))
    }

    /// Find many documents by filter, in the given sort order
    pub async fn find_many(&self, filter: Document, sort: Document) -> Result<Vec<T>, PerkhubError> {
        let cursor = self
            .inner
            .find(live_filter(filter))
            .sort(sort)
            .await
            .map_err(|e| PerkhubError::Database(format!("Find failed: {}", e)))?;

        collect_all(cursor).await
    }

    /// Update one live document, bumping `metadata.updated_at`
    pub async fn update_one(
        &self,
        filter: Document,
        set: Document,
    ) -> Result<UpdateResult, PerkhubError> {
        let mut set = set;
        set.insert("metadata.updated_at", DateTime::now());
        let modifications = UpdateModifications::Document(doc! { "$set": set });

        self.inner
            .update_one(live_filter(filter), modifications)
            .await
            .map_err(|e| PerkhubError::Database(format!("Update failed: {}", e)))
    }

    /// Hard delete every document matching the filter
    pub async fn delete_many(&self, filter: Document) -> Result<u64, PerkhubError> {
        self.inner
            .delete_many(filter)
            .await
            .map(|r| r.deleted_count)
            .map_err(|e| PerkhubError::Database(format!("Delete failed: {}", e)))
    }
}

/// Whether a driver error is a unique index violation (E11000)
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    let error_str = err.to_string();
    error_str.contains("E11000") || error_str.contains("duplicate key")
}
