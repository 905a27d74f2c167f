//! Stops: the physical boarding locations of the network.

use bson::doc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::repository::{Entity, RepoError, Repository};
use crate::schema::{FieldType, Schema, SchemaPair};
use crate::store::IndexSpec;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stop {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
    pub code: String,
    pub name: String,
    pub short_name: String,
    pub tts_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub municipality_id: String,
    pub operational_status: String,
    #[serde(default)]
    pub zone_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStopDto {
    pub code: String,
    pub name: String,
    pub short_name: String,
    pub tts_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub municipality_id: String,
    pub operational_status: String,
    #[serde(default)]
    pub zone_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStopDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipality_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operational_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_ids: Option<Vec<String>>,
}

impl Entity for Stop {
    type Create = CreateStopDto;
    type Update = UpdateStopDto;

    const COLLECTION: &'static str = "stops";
    const ENV_VAR: &'static str = "TML_INTERFACES_STOPS";

    fn indexes() -> Vec<IndexSpec> {
        vec![
            IndexSpec::ascending("code").unique(),
            IndexSpec::ascending("name"),
            IndexSpec::ascending("municipality_id"),
        ]
    }

    fn schemas() -> Option<SchemaPair> {
        Some(SchemaPair::of(
            Schema::new()
                .field("code", FieldType::String)
                .field("name", FieldType::String)
                .field("short_name", FieldType::String)
                .field("tts_name", FieldType::String)
                .field("latitude", FieldType::Double)
                .field("longitude", FieldType::Double)
                .field("municipality_id", FieldType::String)
                .field("operational_status", FieldType::String)
                .field("zone_ids", FieldType::Array(Box::new(FieldType::String))),
        ))
    }
}

impl Repository<Stop> {
    /// Find a stop by its code.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Stop>, RepoError> {
        self.find_one(doc! { "code": code }).await
    }

    /// Stops inside one municipality.
    pub async fn find_by_municipality(
        &self,
        municipality_id: &str,
    ) -> Result<Vec<Stop>, RepoError> {
        self.find_many(Some(doc! { "municipality_id": municipality_id }), None, None, None)
            .await
    }
}
