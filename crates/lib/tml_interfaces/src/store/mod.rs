//! The document store boundary.
//!
//! Repositories talk to one named collection through the [`StoreCollection`]
//! trait; the contract is satisfied by any store offering documents,
//! filter-based queries and declarative secondary indexes. The `mongo`
//! backend is the production driver, the `memory` backend serves tests.

pub mod memory;
pub mod mongo;

use bson::{Bson, Document};
use thiserror::Error;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Errors surfaced by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("error connecting to document store: {0}")]
    Connection(String),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("document store error: {0}")]
    Driver(String),
}

/// Sort direction of one index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexDirection {
    Ascending = 1,
    Descending = -1,
}

/// One declarative secondary index: ordered keys plus a uniqueness flag.
/// Provisioning is idempotent if the index is already present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub keys: Vec<(String, IndexDirection)>,
    pub unique: bool,
}

impl IndexSpec {
    /// Single ascending key.
    pub fn ascending(field: &str) -> Self {
        Self {
            keys: vec![(field.to_string(), IndexDirection::Ascending)],
            unique: false,
        }
    }

    /// Single descending key.
    pub fn descending(field: &str) -> Self {
        Self {
            keys: vec![(field.to_string(), IndexDirection::Descending)],
            unique: false,
        }
    }

    /// Append another ascending key (compound index).
    pub fn and(mut self, field: &str) -> Self {
        self.keys.push((field.to_string(), IndexDirection::Ascending));
        self
    }

    /// Mark the index unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Build a single-key sort document.
pub fn sort_on(field: &str, direction: IndexDirection) -> Document {
    let mut sort = Document::new();
    sort.insert(field, direction as i32);
    sort
}

/// One named collection inside the document store.
///
/// Filters are plain BSON documents; an empty filter matches everything.
/// "Not found" is `None` or a zero count, never an error.
#[async_trait::async_trait]
pub trait StoreCollection: Send + Sync {
    /// Count documents matching the filter.
    async fn count(&self, filter: Document) -> Result<u64, StoreError>;

    /// First document matching the filter, if any.
    async fn find_one(&self, filter: Document) -> Result<Option<Document>, StoreError>;

    /// All documents matching the filter, optionally skipped, limited and
    /// sorted.
    async fn find_many(
        &self,
        filter: Document,
        skip: Option<u64>,
        limit: Option<i64>,
        sort: Option<Document>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Insert one document as-is.
    async fn insert_one(&self, doc: Document) -> Result<(), StoreError>;

    /// Insert several documents as-is.
    async fn insert_many(&self, docs: Vec<Document>) -> Result<(), StoreError>;

    /// Set the given fields on the first matching document. Returns the
    /// modified count (0 or 1).
    async fn update_one(&self, filter: Document, fields: Document) -> Result<u64, StoreError>;

    /// Set the given fields on every matching document. Returns the
    /// modified count.
    async fn update_many(&self, filter: Document, fields: Document) -> Result<u64, StoreError>;

    /// Delete the first matching document. Returns the deleted count.
    async fn delete_one(&self, filter: Document) -> Result<u64, StoreError>;

    /// Delete every matching document. Returns the deleted count.
    async fn delete_many(&self, filter: Document) -> Result<u64, StoreError>;

    /// Distinct values of a field across matching documents.
    async fn distinct(&self, field: &str, filter: Document) -> Result<Vec<Bson>, StoreError>;

    /// Provision the declared indexes; a no-op for indexes already present.
    async fn create_indexes(&self, indexes: &[IndexSpec]) -> Result<(), StoreError>;
}
