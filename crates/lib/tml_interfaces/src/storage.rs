//! The object storage boundary.
//!
//! Providers (S3-compatible or otherwise) live outside this crate; the
//! files repository consumes them through this trait.

use thiserror::Error;

/// Object storage provider failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage provider error: {0}")]
    Provider(String),
}

/// A bucket of keyed objects with signed read URLs.
#[async_trait::async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store an object under `key`, replacing any existing one.
    async fn upload_file(&self, key: &str, body: &[u8]) -> Result<(), StorageError>;

    /// Remove the object under `key`; removing an absent key is not an
    /// error.
    async fn delete_file(&self, key: &str) -> Result<(), StorageError>;

    /// Whether an object exists under `key`.
    async fn file_exists(&self, key: &str) -> Result<bool, StorageError>;

    /// A signed URL for reading the object under `key`.
    async fn get_file_url(&self, key: &str) -> Result<String, StorageError>;

    /// Keys in the bucket, optionally restricted to a prefix.
    async fn list_files(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError>;
}
