//! The generic per-entity repository.
//!
//! One `Repository<E>` per entity: it owns the collection handle, assigns
//! collision-free identifiers on insert, stamps timestamps server-side and
//! gates every validated write through the entity's schema pair.

use std::marker::PhantomData;
use std::sync::Arc;

use bson::{Bson, Document};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use crate::document::{CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};
use crate::ids;
use crate::schema::{SchemaError, SchemaPair};
use crate::store::{IndexSpec, MongoStore, StoreCollection, StoreError};

/// Repository failures. Validation is a client-error kind; missing
/// configuration and connection failures are fatal at startup.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("missing environment variable `{var}` for collection `{collection}`")]
    MissingConfig {
        var: &'static str,
        collection: &'static str,
    },

    #[error("error connecting to `{collection}`")]
    Connect {
        collection: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("no schema pair bound for collection `{0}`; validated writes are unavailable")]
    SchemaUnavailable(&'static str),

    #[error("validation failed: {0}")]
    Validation(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("document serialization failed: {0}")]
    Serialize(#[from] bson::ser::Error),

    #[error("document deserialization failed: {0}")]
    Deserialize(#[from] bson::de::Error),
}

/// Runtime profile; indexes are provisioned in non-production profiles only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Production,
    Development,
}

impl Profile {
    /// Resolve from `TML_ENV` (anything but `production` is development).
    pub fn from_env() -> Self {
        match std::env::var("TML_ENV") {
            Ok(value) if value == "production" => Profile::Production,
            _ => Profile::Development,
        }
    }
}

/// Connection-time settings shared by all repositories.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Logical database holding every collection.
    pub database: String,
    pub profile: Profile,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            database: "production".to_string(),
            profile: Profile::from_env(),
        }
    }
}

/// Static binding of an entity to its collection.
///
/// `schemas()` is the typed schema registry: the pair is attached to the
/// entity's type identity, so there is no name-keyed lookup to typo.
/// Returning `None` means validated writes fail loudly, not that
/// validation is skipped.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    /// Create DTO, serialized into the stored document.
    type Create: Serialize + Send + Sync;
    /// Update DTO, a structurally partial form of the create DTO.
    type Update: Serialize + Send + Sync;

    /// Collection name inside the logical database.
    const COLLECTION: &'static str;
    /// Environment variable naming the store connection string.
    const ENV_VAR: &'static str;

    /// Declared secondary indexes.
    fn indexes() -> Vec<IndexSpec> {
        Vec::new()
    }

    /// The (create, update) schema pair for this entity.
    fn schemas() -> Option<SchemaPair>;
}

/// Generic data access over one entity's collection.
///
/// Cheap to clone; all clones share the underlying collection handle.
pub struct Repository<E: Entity> {
    collection: Arc<dyn StoreCollection>,
    schemas: Option<Arc<SchemaPair>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> std::fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("collection", &E::COLLECTION)
            .finish_non_exhaustive()
    }
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            collection: Arc::clone(&self.collection),
            schemas: self.schemas.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    /// Connect to the store named by `E::ENV_VAR` and bind the collection.
    ///
    /// A missing environment variable is a fatal startup error; so is a
    /// failed connection.
    pub async fn connect(options: &ConnectOptions) -> Result<Self, RepoError> {
        let uri = std::env::var(E::ENV_VAR).map_err(|_| RepoError::MissingConfig {
            var: E::ENV_VAR,
            collection: E::COLLECTION,
        })?;

        info!(collection = E::COLLECTION, "connecting");
        let store = MongoStore::connect(&uri)
            .await
            .map_err(|source| RepoError::Connect {
                collection: E::COLLECTION,
                source,
            })?;
        let collection = store.collection(&options.database, E::COLLECTION);
        let repository = Self::from_collection(collection, options.profile).await?;
        info!(collection = E::COLLECTION, "connected");
        Ok(repository)
    }

    /// Bind an already-connected collection handle (composition-root and
    /// test path). Provisions indexes and resolves the schema pair exactly
    /// like [`connect`](Self::connect).
    pub async fn from_collection(
        collection: Arc<dyn StoreCollection>,
        profile: Profile,
    ) -> Result<Self, RepoError> {
        if profile != Profile::Production {
            let indexes = E::indexes();
            collection
                .create_indexes(&indexes)
                .await
                .map_err(|source| RepoError::Connect {
                    collection: E::COLLECTION,
                    source,
                })?;
            debug!(
                collection = E::COLLECTION,
                count = indexes.len(),
                "indexes provisioned"
            );
        }
        Ok(Self {
            collection,
            schemas: E::schemas().map(Arc::new),
            _entity: PhantomData,
        })
    }

    /// The raw collection handle.
    pub fn collection(&self) -> &Arc<dyn StoreCollection> {
        &self.collection
    }

    fn schemas(&self) -> Result<&SchemaPair, RepoError> {
        self.schemas
            .as_deref()
            .ok_or(RepoError::SchemaUnavailable(E::COLLECTION))
    }

    /// Assign a collision-free identifier (unless the caller supplied one)
    /// and stamp the timestamps (unless the caller supplied them).
    async fn assign_id_and_stamps(&self, doc: &mut Document) -> Result<String, RepoError> {
        if !doc.contains_key(ID_FIELD) {
            loop {
                let candidate = ids::generate_default();
                let mut probe = Document::new();
                probe.insert(ID_FIELD, &candidate);
                if self.collection.find_one(probe).await?.is_none() {
                    doc.insert(ID_FIELD, candidate);
                    break;
                }
            }
        }
        let now = bson::DateTime::now();
        if !doc.contains_key(CREATED_AT_FIELD) {
            doc.insert(CREATED_AT_FIELD, now);
        }
        if !doc.contains_key(UPDATED_AT_FIELD) {
            doc.insert(UPDATED_AT_FIELD, now);
        }
        match doc.get(ID_FIELD) {
            Some(Bson::String(id)) => Ok(id.clone()),
            _ => Err(RepoError::Validation(SchemaError::InvalidType {
                field: ID_FIELD.to_string(),
                expected: "string",
            })),
        }
    }

    /// Insert one document built from the create DTO, validated against the
    /// create schema. Returns the assigned identifier.
    pub async fn insert_one(&self, dto: &E::Create) -> Result<String, RepoError> {
        let mut doc = bson::to_document(dto)?;
        let id = self.assign_id_and_stamps(&mut doc).await?;
        self.schemas()?.create().validate(&doc)?;
        self.collection.insert_one(doc).await?;
        Ok(id)
    }

    /// Insert one raw document, bypassing schema validation. Identifier
    /// assignment and timestamp stamping still apply.
    pub async fn insert_one_unchecked(&self, mut doc: Document) -> Result<String, RepoError> {
        let id = self.assign_id_and_stamps(&mut doc).await?;
        self.collection.insert_one(doc).await?;
        Ok(id)
    }

    /// Insert several documents, each validated against the create schema.
    /// Returns the assigned identifiers in input order.
    pub async fn insert_many(&self, dtos: &[E::Create]) -> Result<Vec<String>, RepoError> {
        let mut docs = Vec::with_capacity(dtos.len());
        let mut assigned = Vec::with_capacity(dtos.len());
        for dto in dtos {
            let mut doc = bson::to_document(dto)?;
            let id = self.assign_id_and_stamps(&mut doc).await?;
            self.schemas()?.create().validate(&doc)?;
            assigned.push(id);
            docs.push(doc);
        }
        self.collection.insert_many(docs).await?;
        Ok(assigned)
    }

    /// Count documents matching the filter (all documents when `None`).
    pub async fn count(&self, filter: Option<Document>) -> Result<u64, RepoError> {
        Ok(self.collection.count(filter.unwrap_or_default()).await?)
    }

    /// Find a document by its identifier.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<E>, RepoError> {
        let mut filter = Document::new();
        filter.insert(ID_FIELD, id);
        self.find_one(filter).await
    }

    /// First document matching the filter, if any.
    pub async fn find_one(&self, filter: Document) -> Result<Option<E>, RepoError> {
        match self.collection.find_one(filter).await? {
            Some(doc) => Ok(Some(bson::from_document(doc)?)),
            None => Ok(None),
        }
    }

    /// Documents matching the filter, with optional offset pagination
    /// (`skip = per_page * (page - 1)`, applied only when both are given)
    /// and sorting.
    pub async fn find_many(
        &self,
        filter: Option<Document>,
        per_page: Option<i64>,
        page: Option<i64>,
        sort: Option<Document>,
    ) -> Result<Vec<E>, RepoError> {
        let skip = match (per_page, page) {
            (Some(per_page), Some(page)) => Some((per_page * (page - 1)).max(0) as u64),
            _ => None,
        };
        let docs = self
            .collection
            .find_many(filter.unwrap_or_default(), skip, per_page, sort)
            .await?;
        docs.into_iter()
            .map(|doc| bson::from_document(doc).map_err(RepoError::from))
            .collect()
    }

    /// Every document in the collection.
    pub async fn all(&self) -> Result<Vec<E>, RepoError> {
        self.find_many(None, None, None, None).await
    }

    /// Distinct values of one field across matching documents.
    pub async fn distinct(
        &self,
        field: &str,
        filter: Option<Document>,
    ) -> Result<Vec<Bson>, RepoError> {
        Ok(self
            .collection
            .distinct(field, filter.unwrap_or_default())
            .await?)
    }

    /// Update a document by identifier. Returns the modified count
    /// (0 means no match, not an error).
    pub async fn update_by_id(&self, id: &str, fields: &E::Update) -> Result<u64, RepoError> {
        let mut filter = Document::new();
        filter.insert(ID_FIELD, id);
        self.update_one(filter, fields).await
    }

    /// Update the first document matching the filter, validating the fields
    /// against the update schema and stamping a fresh `updated_at`.
    pub async fn update_one(&self, filter: Document, fields: &E::Update) -> Result<u64, RepoError> {
        let set = self.prepare_update(fields)?;
        Ok(self.collection.update_one(filter, set).await?)
    }

    /// Update every document matching the filter.
    pub async fn update_many(
        &self,
        filter: Document,
        fields: &E::Update,
    ) -> Result<u64, RepoError> {
        let set = self.prepare_update(fields)?;
        Ok(self.collection.update_many(filter, set).await?)
    }

    fn prepare_update(&self, fields: &E::Update) -> Result<Document, RepoError> {
        let mut set = bson::to_document(fields)?;
        self.schemas()?.update().validate(&set)?;
        set.insert(UPDATED_AT_FIELD, bson::DateTime::now());
        Ok(set)
    }

    /// Delete the first document matching the filter. Returns the deleted
    /// count (0 means no match, not an error).
    pub async fn delete_one(&self, filter: Document) -> Result<u64, RepoError> {
        Ok(self.collection.delete_one(filter).await?)
    }

    /// Delete every document matching the filter.
    pub async fn delete_many(&self, filter: Document) -> Result<u64, RepoError> {
        Ok(self.collection.delete_many(filter).await?)
    }
}
