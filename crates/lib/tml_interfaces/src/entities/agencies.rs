//! Agencies: the operators running the network.

use bson::doc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::repository::{Entity, RepoError, Repository};
use crate::schema::{FieldType, Schema, SchemaPair};
use crate::store::IndexSpec;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agency {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
    pub code: String,
    pub name: String,
    pub email: String,
    pub lang: String,
    pub timezone: String,
    pub phone: String,
    pub url: String,
    pub is_locked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAgencyDto {
    pub code: String,
    pub name: String,
    pub email: String,
    pub lang: String,
    pub timezone: String,
    pub phone: String,
    pub url: String,
    pub is_locked: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAgencyDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_locked: Option<bool>,
}

impl Entity for Agency {
    type Create = CreateAgencyDto;
    type Update = UpdateAgencyDto;

    const COLLECTION: &'static str = "agencies";
    const ENV_VAR: &'static str = "TML_INTERFACES_AGENCIES";

    fn indexes() -> Vec<IndexSpec> {
        vec![
            IndexSpec::ascending("name").unique(),
            IndexSpec::ascending("code").unique(),
            IndexSpec::ascending("email").unique(),
        ]
    }

    fn schemas() -> Option<SchemaPair> {
        Some(SchemaPair::of(
            Schema::new()
                .field("code", FieldType::String)
                .field("name", FieldType::String)
                .field("email", FieldType::String)
                .field("lang", FieldType::String)
                .field("timezone", FieldType::String)
                .field("phone", FieldType::String)
                .field("url", FieldType::String)
                .field("is_locked", FieldType::Bool),
        ))
    }
}

impl Repository<Agency> {
    /// Find an agency by its code.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Agency>, RepoError> {
        self.find_one(doc! { "code": code }).await
    }

    /// Update an agency by its code. Returns the modified count.
    pub async fn update_by_code(
        &self,
        code: &str,
        fields: &UpdateAgencyDto,
    ) -> Result<u64, RepoError> {
        self.update_one(doc! { "code": code }, fields).await
    }
}
