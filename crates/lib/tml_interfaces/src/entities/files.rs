//! Files: document metadata plus the stored object behind it.
//!
//! The repository pairs the files collection with an object storage
//! provider so the document and the object stay in step.

use std::sync::Arc;

use bson::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::repository::{ConnectOptions, Entity, Profile, RepoError, Repository};
use crate::schema::{FieldType, Schema, SchemaPair};
use crate::storage::{ObjectStorage, StorageError};
use crate::store::{IndexSpec, StoreCollection};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
    pub name: String,
    pub size: i64,
    #[serde(rename = "type")]
    pub content_type: String,
    /// Object storage key.
    pub key: String,
    pub created_by: String,
    pub updated_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Document>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFileDto {
    pub name: String,
    pub size: i64,
    #[serde(rename = "type")]
    pub content_type: String,
    pub key: String,
    pub created_by: String,
    pub updated_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Document>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFileDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Document>,
}

impl Entity for File {
    type Create = CreateFileDto;
    type Update = UpdateFileDto;

    const COLLECTION: &'static str = "files";
    const ENV_VAR: &'static str = "TML_INTERFACES_FILES";

    fn indexes() -> Vec<IndexSpec> {
        vec![IndexSpec::ascending("key").unique()]
    }

    fn schemas() -> Option<SchemaPair> {
        Some(SchemaPair::of(
            Schema::new()
                .field("name", FieldType::String)
                .field("size", FieldType::Int)
                .field("type", FieldType::String)
                .field("key", FieldType::String)
                .field("created_by", FieldType::String)
                .field("updated_by", FieldType::String)
                .optional("metadata", FieldType::Object),
        ))
    }
}

/// Files repository failure: either side of the pairing.
#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Files collection plus its object storage collaborator.
#[derive(Clone)]
pub struct FilesRepository {
    repo: Repository<File>,
    storage: Arc<dyn ObjectStorage>,
}

impl FilesRepository {
    pub fn new(repo: Repository<File>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { repo, storage }
    }

    pub async fn connect(
        options: &ConnectOptions,
        storage: Arc<dyn ObjectStorage>,
    ) -> Result<Self, RepoError> {
        Ok(Self {
            repo: Repository::connect(options).await?,
            storage,
        })
    }

    pub async fn from_collection(
        collection: Arc<dyn StoreCollection>,
        profile: Profile,
        storage: Arc<dyn ObjectStorage>,
    ) -> Result<Self, RepoError> {
        Ok(Self {
            repo: Repository::from_collection(collection, profile).await?,
            storage,
        })
    }

    /// The underlying generic repository.
    pub fn inner(&self) -> &Repository<File> {
        &self.repo
    }

    /// Store the object, then the document describing it. Returns the
    /// document identifier.
    pub async fn upload(&self, dto: &CreateFileDto, body: &[u8]) -> Result<String, FileError> {
        self.storage.upload_file(&dto.key, body).await?;
        let id = self.repo.insert_one(dto).await?;
        debug!(key = %dto.key, "file uploaded");
        Ok(id)
    }

    /// Signed URL for a file document; `None` when the document does not
    /// exist.
    pub async fn file_url(&self, file_id: &str) -> Result<Option<String>, FileError> {
        match self.repo.find_by_id(file_id).await? {
            Some(file) => Ok(Some(self.storage.get_file_url(&file.key).await?)),
            None => Ok(None),
        }
    }

    /// Delete document and object. Returns the deleted document count
    /// (0 when absent).
    pub async fn delete(&self, file_id: &str) -> Result<u64, FileError> {
        let Some(file) = self.repo.find_by_id(file_id).await? else {
            return Ok(0);
        };
        self.storage.delete_file(&file.key).await?;
        let mut filter = Document::new();
        filter.insert("_id", &file.id);
        Ok(self.repo.delete_one(filter).await?)
    }
}
