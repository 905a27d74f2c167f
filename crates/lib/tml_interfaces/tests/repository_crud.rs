//! Repository contract over the in-memory store: identifier assignment,
//! schema gating, timestamp stamping and not-found semantics.

use std::collections::HashSet;
use std::sync::Arc;

use bson::{Document, doc};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tml_interfaces::entities::{Agency, CreateAgencyDto, UpdateAgencyDto};
use tml_interfaces::schema::SchemaError;
use tml_interfaces::store::MemoryStore;
use tml_interfaces::{Entity, FieldType, Profile, RepoError, Repository, Schema, SchemaPair};

/// Raw-document entity used to exercise the schema gate directly.
#[derive(Debug, Serialize, Deserialize)]
struct Thing {
    #[serde(rename = "_id")]
    id: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    updated_at: DateTime<Utc>,
    name: String,
    code: String,
}

impl Entity for Thing {
    type Create = Document;
    type Update = Document;

    const COLLECTION: &'static str = "things";
    const ENV_VAR: &'static str = "TML_INTERFACES_THINGS";

    fn schemas() -> Option<SchemaPair> {
        Some(SchemaPair::of(
            Schema::new()
                .field("name", FieldType::String)
                .field("code", FieldType::String),
        ))
    }
}

/// Entity with no schema pair bound: validated writes must fail loudly.
#[derive(Debug, Serialize, Deserialize)]
struct Unschemad {
    #[serde(rename = "_id")]
    id: String,
}

impl Entity for Unschemad {
    type Create = Document;
    type Update = Document;

    const COLLECTION: &'static str = "unschemad";
    const ENV_VAR: &'static str = "TML_INTERFACES_UNSCHEMAD";

    fn schemas() -> Option<SchemaPair> {
        None
    }
}

async fn repository<E: Entity>() -> Repository<E> {
    let store = MemoryStore::new();
    Repository::from_collection(store.collection(E::COLLECTION), Profile::Development)
        .await
        .unwrap()
}

fn agency_dto(code: &str) -> CreateAgencyDto {
    CreateAgencyDto {
        code: code.to_string(),
        name: format!("Agency {code}"),
        email: format!("{code}@example.com"),
        lang: "pt".to_string(),
        timezone: "Europe/Lisbon".to_string(),
        phone: "+351210000000".to_string(),
        url: "https://example.com".to_string(),
        is_locked: false,
    }
}

#[tokio::test]
async fn insert_missing_required_field_names_the_field() {
    let things = repository::<Thing>().await;

    let err = things.insert_one(&doc! { "name": "X" }).await.unwrap_err();
    match err {
        RepoError::Validation(SchemaError::MissingField(field)) => assert_eq!(field, "code"),
        other => panic!("expected missing-field validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn insert_valid_document_assigns_id_and_timestamps() {
    let things = repository::<Thing>().await;

    let id = things
        .insert_one(&doc! { "name": "X", "code": "C1" })
        .await
        .unwrap();
    assert_eq!(id.len(), 5);

    let thing = things.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(thing.name, "X");
    assert_eq!(thing.code, "C1");
    assert!(thing.created_at <= Utc::now());
    assert_eq!(thing.created_at, thing.updated_at);
}

#[tokio::test]
async fn insert_undeclared_field_is_rejected() {
    let things = repository::<Thing>().await;

    let err = things
        .insert_one(&doc! { "name": "X", "code": "C1", "surprise": true })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(SchemaError::UnknownField(_))
    ));
}

#[tokio::test]
async fn caller_supplied_id_and_timestamps_are_kept() {
    let things = repository::<Thing>().await;

    let stamp = bson::DateTime::from_millis(1_700_000_000_000);
    let id = things
        .insert_one(&doc! {
            "_id": "FIXED",
            "created_at": stamp,
            "updated_at": stamp,
            "name": "X",
            "code": "C1",
        })
        .await
        .unwrap();
    assert_eq!(id, "FIXED");

    let thing = things.find_by_id("FIXED").await.unwrap().unwrap();
    assert_eq!(thing.created_at.timestamp_millis(), 1_700_000_000_000);
}

#[tokio::test]
async fn sequential_inserts_assign_pairwise_distinct_ids() {
    let things = repository::<Unschemad>().await;

    let mut seen = HashSet::new();
    for _ in 0..10_000 {
        let id = things.insert_one_unchecked(Document::new()).await.unwrap();
        assert_eq!(id.len(), 5);
        assert!(seen.insert(id), "identifier assigned twice");
    }
}

#[tokio::test]
async fn validated_writes_without_a_schema_pair_fail_loudly() {
    let repo = repository::<Unschemad>().await;

    let err = repo.insert_one(&doc! { "name": "X" }).await.unwrap_err();
    assert!(matches!(err, RepoError::SchemaUnavailable("unschemad")));

    let err = repo
        .update_by_id("AAAAA", &doc! { "name": "Y" })
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::SchemaUnavailable("unschemad")));

    // The unchecked path is still open.
    let id = repo.insert_one_unchecked(Document::new()).await.unwrap();
    assert!(repo.find_by_id(&id).await.unwrap().is_some());
}

#[tokio::test]
async fn update_is_partial_and_refreshes_updated_at() {
    let agencies = repository::<Agency>().await;

    let id = agencies.insert_one(&agency_dto("CM")).await.unwrap();
    let before = agencies.find_by_id(&id).await.unwrap().unwrap();

    let modified = agencies
        .update_by_id(
            &id,
            &UpdateAgencyDto {
                name: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(modified, 1);

    let after = agencies.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(after.name, "Renamed");
    // Unspecified fields survive.
    assert_eq!(after.code, before.code);
    assert_eq!(after.email, before.email);
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at >= before.updated_at);
}

#[tokio::test]
async fn update_fields_are_validated_against_the_update_schema() {
    let things = repository::<Thing>().await;
    let id = things
        .insert_one(&doc! { "name": "X", "code": "C1" })
        .await
        .unwrap();

    let err = things
        .update_by_id(&id, &doc! { "code": 999 })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(SchemaError::InvalidType { .. })
    ));
}

#[tokio::test]
async fn not_found_is_not_an_error() {
    let agencies = repository::<Agency>().await;

    assert!(agencies.find_by_id("ZZZZZ").await.unwrap().is_none());
    assert_eq!(
        agencies.delete_one(doc! { "_id": "ZZZZZ" }).await.unwrap(),
        0
    );
    assert_eq!(
        agencies
            .update_by_id("ZZZZZ", &UpdateAgencyDto::default())
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn find_many_paginates_only_when_both_parameters_are_given() {
    let things = repository::<Thing>().await;
    for i in 0..5 {
        things
            .insert_one(&doc! { "name": format!("T{i}"), "code": format!("{i:03}") })
            .await
            .unwrap();
    }

    let sort = tml_interfaces::store::sort_on("code", tml_interfaces::IndexDirection::Ascending);

    let all = things
        .find_many(None, Some(2), None, Some(sort.clone()))
        .await
        .unwrap();
    // Page absent: limit applies, no skip.
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].code, "000");

    let page_two = things
        .find_many(None, Some(2), Some(2), Some(sort))
        .await
        .unwrap();
    assert_eq!(page_two.len(), 2);
    assert_eq!(page_two[0].code, "002");
}

#[tokio::test]
async fn count_and_distinct() {
    let things = repository::<Thing>().await;
    for code in ["A", "A", "B"] {
        things
            .insert_one(&doc! { "name": "X", "code": code })
            .await
            .unwrap();
    }

    assert_eq!(things.count(None).await.unwrap(), 3);
    assert_eq!(
        things.count(Some(doc! { "code": "A" })).await.unwrap(),
        2
    );
    assert_eq!(things.distinct("code", None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn insert_many_validates_and_assigns_every_document() {
    let things = repository::<Thing>().await;

    let ids = things
        .insert_many(&[
            doc! { "name": "A", "code": "001" },
            doc! { "name": "B", "code": "002" },
        ])
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
    assert_eq!(things.count(None).await.unwrap(), 2);

    // One bad document rejects before anything is written.
    let err = things
        .insert_many(&[doc! { "name": "C", "code": "003" }, doc! { "name": "D" }])
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(things.count(None).await.unwrap(), 2);
}

#[tokio::test]
async fn connect_without_environment_variable_is_fatal() {
    // TML_INTERFACES_THINGS is never set in the test environment.
    let err = Repository::<Thing>::connect(&tml_interfaces::ConnectOptions {
        database: "production".to_string(),
        profile: Profile::Development,
    })
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        RepoError::MissingConfig {
            var: "TML_INTERFACES_THINGS",
            collection: "things",
        }
    ));
}

#[tokio::test]
async fn duplicate_unique_key_surfaces_as_a_store_error() {
    let agencies = repository::<Agency>().await;
    agencies.insert_one(&agency_dto("CM")).await.unwrap();

    let err = agencies.insert_one(&agency_dto("CM")).await.unwrap_err();
    assert!(matches!(
        err,
        RepoError::Store(tml_interfaces::StoreError::DuplicateKey(_))
    ));
}

#[tokio::test]
async fn repositories_over_the_same_collection_share_state() {
    let store = Arc::new(MemoryStore::new());
    let a: Repository<Agency> =
        Repository::from_collection(store.collection(Agency::COLLECTION), Profile::Development)
            .await
            .unwrap();
    let b: Repository<Agency> =
        Repository::from_collection(store.collection(Agency::COLLECTION), Profile::Development)
            .await
            .unwrap();

    a.insert_one(&agency_dto("CM")).await.unwrap();
    assert!(b.find_by_code("CM").await.unwrap().is_some());
}
