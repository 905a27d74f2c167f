//! Users and the hash-stripping repository wrapper.
//!
//! Credentials never leave this module: every read path strips the
//! password hash unless the caller opts in (the login flow).

use bson::{Document, doc};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::Permission;
use crate::repository::{ConnectOptions, Entity, Profile, RepoError, Repository};
use crate::schema::{FieldType, Schema, SchemaPair};
use crate::store::{IndexSpec, StoreCollection};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Grants held directly, independent of roles.
    #[serde(default)]
    pub permissions: Vec<Permission>,
    /// Weak role references; no cascading delete implied.
    #[serde(default)]
    pub role_ids: Vec<String>,
    /// Weak back-references, informational only.
    #[serde(default)]
    pub session_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserDto {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub password_hash: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub role_ids: Vec<String>,
    #[serde(default)]
    pub session_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<Permission>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_ids: Option<Vec<String>>,
}

impl Entity for User {
    type Create = CreateUserDto;
    type Update = UpdateUserDto;

    const COLLECTION: &'static str = "users";
    const ENV_VAR: &'static str = "TML_INTERFACES_AUTH";

    fn indexes() -> Vec<IndexSpec> {
        vec![
            IndexSpec::ascending("email").unique(),
            IndexSpec::ascending("role_ids"),
            IndexSpec::ascending("session_ids"),
        ]
    }

    fn schemas() -> Option<SchemaPair> {
        Some(SchemaPair::of(
            Schema::new()
                .field("email", FieldType::String)
                .field("first_name", FieldType::String)
                .field("last_name", FieldType::String)
                .field("phone", FieldType::String)
                .field("password_hash", FieldType::String)
                .field("permissions", FieldType::Array(Box::new(FieldType::Object)))
                .field("role_ids", FieldType::Array(Box::new(FieldType::String)))
                .field("session_ids", FieldType::Array(Box::new(FieldType::String))),
        ))
    }
}

/// User repository with credential hygiene baked into every read path.
#[derive(Clone)]
pub struct UsersRepository {
    repo: Repository<User>,
}

impl UsersRepository {
    pub async fn connect(options: &ConnectOptions) -> Result<Self, RepoError> {
        Ok(Self {
            repo: Repository::connect(options).await?,
        })
    }

    pub async fn from_collection(
        collection: Arc<dyn StoreCollection>,
        profile: Profile,
    ) -> Result<Self, RepoError> {
        Ok(Self {
            repo: Repository::from_collection(collection, profile).await?,
        })
    }

    /// The underlying generic repository, for write paths.
    pub fn inner(&self) -> &Repository<User> {
        &self.repo
    }

    fn strip(mut user: User) -> User {
        user.password_hash = None;
        user
    }

    /// Find a user by identifier; the hash is stripped unless requested.
    pub async fn find_by_id(
        &self,
        id: &str,
        include_password_hash: bool,
    ) -> Result<Option<User>, RepoError> {
        let user = self.repo.find_by_id(id).await?;
        Ok(match user {
            Some(user) if !include_password_hash => Some(Self::strip(user)),
            other => other,
        })
    }

    /// Find a user by email; the hash is stripped unless requested.
    pub async fn find_by_email(
        &self,
        email: &str,
        include_password_hash: bool,
    ) -> Result<Option<User>, RepoError> {
        let user = self.repo.find_one(doc! { "email": email }).await?;
        Ok(match user {
            Some(user) if !include_password_hash => Some(Self::strip(user)),
            other => other,
        })
    }

    /// Users holding a given role.
    pub async fn find_by_role(&self, role_id: &str) -> Result<Vec<User>, RepoError> {
        let users = self
            .repo
            .find_many(Some(doc! { "role_ids": { "$in": [role_id] } }), None, None, None)
            .await?;
        Ok(users.into_iter().map(Self::strip).collect())
    }

    /// Filtered, paginated listing; hashes always stripped.
    pub async fn find_many(
        &self,
        filter: Option<Document>,
        per_page: Option<i64>,
        page: Option<i64>,
        sort: Option<Document>,
    ) -> Result<Vec<User>, RepoError> {
        let users = self.repo.find_many(filter, per_page, page, sort).await?;
        Ok(users.into_iter().map(Self::strip).collect())
    }

    /// Create a user (validated against the create schema).
    pub async fn insert_one(&self, dto: &CreateUserDto) -> Result<String, RepoError> {
        self.repo.insert_one(dto).await
    }

    /// Update a user by identifier. Returns the modified count.
    pub async fn update_by_id(&self, id: &str, fields: &UpdateUserDto) -> Result<u64, RepoError> {
        self.repo.update_by_id(id, fields).await
    }
}
