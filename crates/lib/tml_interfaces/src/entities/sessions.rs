//! Sessions: the sole proof of authentication.
//!
//! A session's existence is the whole story — there is no revocation list,
//! and `expires_at` is informational at this layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::optional_datetime;
use crate::repository::Entity;
use crate::schema::{FieldType, Schema, SchemaPair};
use crate::store::IndexSpec;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
    pub token: String,
    pub user_id: String,
    #[serde(default, with = "optional_datetime", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionDto {
    pub token: String,
    pub user_id: String,
    #[serde(default, with = "optional_datetime", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSessionDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, with = "optional_datetime", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Entity for Session {
    type Create = CreateSessionDto;
    type Update = UpdateSessionDto;

    const COLLECTION: &'static str = "sessions";
    const ENV_VAR: &'static str = "TML_INTERFACES_AUTH";

    fn indexes() -> Vec<IndexSpec> {
        vec![
            IndexSpec::ascending("token").unique(),
            IndexSpec::ascending("user_id"),
            IndexSpec::ascending("expires_at"),
        ]
    }

    fn schemas() -> Option<SchemaPair> {
        Some(SchemaPair::of(
            Schema::new()
                .field("token", FieldType::String)
                .field("user_id", FieldType::String)
                .optional("expires_at", FieldType::DateTime),
        ))
    }
}
