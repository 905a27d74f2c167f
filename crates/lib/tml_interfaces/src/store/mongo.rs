//! MongoDB store backend.

use std::sync::Arc;

use bson::{Bson, Document};
use futures::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, IndexModel};
use tracing::info;

use super::{IndexSpec, StoreCollection, StoreError};

/// A connected MongoDB client.
pub struct MongoStore {
    client: Client,
}

impl MongoStore {
    /// Connect to the store at `uri`.
    pub async fn connect(uri: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        info!("connected to document store");
        Ok(Self { client })
    }

    /// Bind a named collection inside a logical database.
    pub fn collection(&self, database: &str, name: &str) -> Arc<dyn StoreCollection> {
        Arc::new(MongoCollection {
            inner: self.client.database(database).collection::<Document>(name),
        })
    }

    /// Close the connection. Pending operations on bound collections fail
    /// afterwards.
    pub async fn disconnect(self) {
        self.client.shutdown().await;
        info!("disconnected from document store");
    }
}

struct MongoCollection {
    inner: mongodb::Collection<Document>,
}

fn map_err(err: mongodb::error::Error) -> StoreError {
    if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = &*err.kind
        && write_error.code == 11000
    {
        return StoreError::DuplicateKey(write_error.message.clone());
    }
    if let ErrorKind::InsertMany(failure) = &*err.kind
        && let Some(write_errors) = &failure.write_errors
        && write_errors.iter().any(|e| e.code == 11000)
    {
        return StoreError::DuplicateKey("duplicate key in bulk insert".to_string());
    }
    StoreError::Driver(err.to_string())
}

#[async_trait::async_trait]
impl StoreCollection for MongoCollection {
    async fn count(&self, filter: Document) -> Result<u64, StoreError> {
        self.inner.count_documents(filter).await.map_err(map_err)
    }

    async fn find_one(&self, filter: Document) -> Result<Option<Document>, StoreError> {
        self.inner.find_one(filter).await.map_err(map_err)
    }

    async fn find_many(
        &self,
        filter: Document,
        skip: Option<u64>,
        limit: Option<i64>,
        sort: Option<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        let mut find = self.inner.find(filter);
        if let Some(sort) = sort {
            find = find.sort(sort);
        }
        if let Some(skip) = skip {
            find = find.skip(skip);
        }
        if let Some(limit) = limit {
            find = find.limit(limit);
        }
        let cursor = find.await.map_err(map_err)?;
        cursor.try_collect().await.map_err(map_err)
    }

    async fn insert_one(&self, doc: Document) -> Result<(), StoreError> {
        self.inner.insert_one(doc).await.map_err(map_err)?;
        Ok(())
    }

    async fn insert_many(&self, docs: Vec<Document>) -> Result<(), StoreError> {
        self.inner.insert_many(docs).await.map_err(map_err)?;
        Ok(())
    }

    async fn update_one(&self, filter: Document, fields: Document) -> Result<u64, StoreError> {
        let result = self
            .inner
            .update_one(filter, bson::doc! { "$set": fields })
            .await
            .map_err(map_err)?;
        Ok(result.modified_count)
    }

    async fn update_many(&self, filter: Document, fields: Document) -> Result<u64, StoreError> {
        let result = self
            .inner
            .update_many(filter, bson::doc! { "$set": fields })
            .await
            .map_err(map_err)?;
        Ok(result.modified_count)
    }

    async fn delete_one(&self, filter: Document) -> Result<u64, StoreError> {
        let result = self.inner.delete_one(filter).await.map_err(map_err)?;
        Ok(result.deleted_count)
    }

    async fn delete_many(&self, filter: Document) -> Result<u64, StoreError> {
        let result = self.inner.delete_many(filter).await.map_err(map_err)?;
        Ok(result.deleted_count)
    }

    async fn distinct(&self, field: &str, filter: Document) -> Result<Vec<Bson>, StoreError> {
        self.inner.distinct(field, filter).await.map_err(map_err)
    }

    async fn create_indexes(&self, indexes: &[IndexSpec]) -> Result<(), StoreError> {
        if indexes.is_empty() {
            return Ok(());
        }
        let models: Vec<IndexModel> = indexes
            .iter()
            .map(|spec| {
                let mut keys = Document::new();
                for (field, direction) in &spec.keys {
                    keys.insert(field, *direction as i32);
                }
                let options = IndexOptions::builder().unique(spec.unique).build();
                IndexModel::builder().keys(keys).options(options).build()
            })
            .collect();
        self.inner.create_indexes(models).await.map_err(map_err)?;
        Ok(())
    }
}
