//! Roles: named bundles of permissions referenced by users.

use bson::doc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Permission;
use crate::repository::{Entity, RepoError, Repository};
use crate::schema::{FieldType, Schema, SchemaPair};
use crate::store::IndexSpec;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
    pub name: String,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoleDto {
    pub name: String,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRoleDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<Permission>>,
}

impl Entity for Role {
    type Create = CreateRoleDto;
    type Update = UpdateRoleDto;

    const COLLECTION: &'static str = "roles";
    const ENV_VAR: &'static str = "TML_INTERFACES_AUTH";

    fn indexes() -> Vec<IndexSpec> {
        vec![IndexSpec::ascending("name").unique()]
    }

    fn schemas() -> Option<SchemaPair> {
        Some(SchemaPair::of(
            Schema::new()
                .field("name", FieldType::String)
                .field("permissions", FieldType::Array(Box::new(FieldType::Object))),
        ))
    }
}

impl Repository<Role> {
    /// Find a role by its unique name.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Role>, RepoError> {
        self.find_one(doc! { "name": name }).await
    }
}
