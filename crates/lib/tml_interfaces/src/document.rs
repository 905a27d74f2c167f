//! The base document shape shared by every entity.
//!
//! Every persisted document carries a string `_id` (immutable after
//! creation) and server-side `created_at`/`updated_at` timestamps.

/// Field name of the document identifier.
pub const ID_FIELD: &str = "_id";

/// Field name of the creation timestamp.
pub const CREATED_AT_FIELD: &str = "created_at";

/// Field name of the last-write timestamp.
pub const UPDATED_AT_FIELD: &str = "updated_at";

/// The three fields every document carries, admitted by every schema.
pub const BASE_FIELDS: [&str; 3] = [ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD];

/// Current time as a BSON datetime.
pub fn now() -> bson::DateTime {
    bson::DateTime::now()
}

/// Serde bridge for `Option<chrono::DateTime<Utc>>` stored as a BSON
/// datetime (the non-optional case is covered by
/// `bson::serde_helpers::chrono_datetime_as_bson_datetime`).
pub mod optional_datetime {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value
            .map(bson::DateTime::from_chrono)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<bson::DateTime>::deserialize(deserializer)?;
        Ok(value.map(bson::DateTime::to_chrono))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Stamped {
        #[serde(default, with = "optional_datetime")]
        expires_at: Option<DateTime<Utc>>,
    }

    #[test]
    fn optional_datetime_roundtrips_as_bson_datetime() {
        let stamped = Stamped {
            expires_at: Some(Utc::now()),
        };
        let doc = bson::to_document(&stamped).unwrap();
        assert!(matches!(doc.get("expires_at"), Some(bson::Bson::DateTime(_))));

        let back: Stamped = bson::from_document(doc).unwrap();
        // BSON datetimes carry millisecond precision.
        assert_eq!(
            back.expires_at.unwrap().timestamp_millis(),
            stamped.expires_at.unwrap().timestamp_millis()
        );
    }

    #[test]
    fn absent_optional_datetime_is_none() {
        let back: Stamped = bson::from_document(bson::Document::new()).unwrap();
        assert!(back.expires_at.is_none());
    }
}
