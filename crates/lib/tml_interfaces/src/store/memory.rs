//! In-memory store backend.
//!
//! Implements the same contract as the MongoDB backend for the filter
//! subset the repositories actually issue: top-level equality and `$in`.
//! Unique indexes are honored so duplicate-key paths are exercisable
//! without a live server.

use std::cmp::Ordering;
use std::sync::Arc;

use bson::{Bson, Document};
use dashmap::DashMap;
use tokio::sync::RwLock;

use super::{IndexSpec, StoreCollection, StoreError};

/// A process-local document store keyed by collection name.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, Arc<MemoryCollection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a named collection, creating it on first use. Handles to the
    /// same name share state.
    pub fn collection(&self, name: &str) -> Arc<dyn StoreCollection> {
        self.collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCollection::default()))
            .clone()
    }
}

#[derive(Default)]
struct MemoryCollection {
    docs: RwLock<Vec<Document>>,
    indexes: RwLock<Vec<IndexSpec>>,
}

/// Top-level filter match: equality or an operator document per field.
fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(field, expected)| {
        let actual = doc.get(field);
        match expected {
            Bson::Document(cond) if cond.keys().any(|k| k.starts_with('$')) => {
                cond.iter().all(|(op, operand)| match op.as_str() {
                    "$in" => match operand {
                        Bson::Array(allowed) => match actual {
                            // An array field matches when it intersects.
                            Some(Bson::Array(values)) => {
                                values.iter().any(|v| allowed.contains(v))
                            }
                            Some(value) => allowed.contains(value),
                            None => false,
                        },
                        _ => false,
                    },
                    "$ne" => actual != Some(operand),
                    "$exists" => {
                        let wanted = matches!(operand, Bson::Boolean(true));
                        actual.is_some() == wanted
                    }
                    _ => false,
                })
            }
            _ => actual == Some(expected),
        }
    })
}

/// Ordering over the BSON scalars the store sorts by.
fn cmp_bson(a: &Bson, b: &Bson) -> Ordering {
    match (a, b) {
        (Bson::String(a), Bson::String(b)) => a.cmp(b),
        (Bson::Int32(a), Bson::Int32(b)) => a.cmp(b),
        (Bson::Int64(a), Bson::Int64(b)) => a.cmp(b),
        (Bson::Int32(a), Bson::Int64(b)) => i64::from(*a).cmp(b),
        (Bson::Int64(a), Bson::Int32(b)) => a.cmp(&i64::from(*b)),
        (Bson::Double(a), Bson::Double(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (Bson::Boolean(a), Bson::Boolean(b)) => a.cmp(b),
        (Bson::DateTime(a), Bson::DateTime(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

impl MemoryCollection {
    /// Values of the index keys in a candidate document, or `None` when the
    /// candidate has none of them (sparse behavior).
    fn index_values(index: &IndexSpec, doc: &Document) -> Option<Vec<Bson>> {
        let values: Vec<Bson> = index
            .keys
            .iter()
            .filter_map(|(field, _)| doc.get(field).cloned())
            .collect();
        if values.is_empty() { None } else { Some(values) }
    }

    fn check_unique(
        indexes: &[IndexSpec],
        docs: &[Document],
        candidate: &Document,
    ) -> Result<(), StoreError> {
        for index in indexes.iter().filter(|i| i.unique) {
            let Some(values) = Self::index_values(index, candidate) else {
                continue;
            };
            let collision = docs
                .iter()
                .any(|existing| Self::index_values(index, existing).as_ref() == Some(&values));
            if collision {
                let fields: Vec<&str> = index.keys.iter().map(|(f, _)| f.as_str()).collect();
                return Err(StoreError::DuplicateKey(fields.join(", ")));
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl StoreCollection for MemoryCollection {
    async fn count(&self, filter: Document) -> Result<u64, StoreError> {
        let docs = self.docs.read().await;
        Ok(docs.iter().filter(|d| matches(d, &filter)).count() as u64)
    }

    async fn find_one(&self, filter: Document) -> Result<Option<Document>, StoreError> {
        let docs = self.docs.read().await;
        Ok(docs.iter().find(|d| matches(d, &filter)).cloned())
    }

    async fn find_many(
        &self,
        filter: Document,
        skip: Option<u64>,
        limit: Option<i64>,
        sort: Option<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        let docs = self.docs.read().await;
        let mut found: Vec<Document> = docs.iter().filter(|d| matches(d, &filter)).cloned().collect();

        if let Some(sort) = sort {
            found.sort_by(|a, b| {
                for (field, direction) in &sort {
                    let ordering = match (a.get(field), b.get(field)) {
                        (Some(x), Some(y)) => cmp_bson(x, y),
                        (Some(_), None) => Ordering::Greater,
                        (None, Some(_)) => Ordering::Less,
                        (None, None) => Ordering::Equal,
                    };
                    let descending = matches!(direction, Bson::Int32(-1) | Bson::Int64(-1));
                    let ordering = if descending { ordering.reverse() } else { ordering };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        let skip = skip.unwrap_or(0) as usize;
        let mut found: Vec<Document> = found.into_iter().skip(skip).collect();
        if let Some(limit) = limit {
            found.truncate(limit.max(0) as usize);
        }
        Ok(found)
    }

    async fn insert_one(&self, doc: Document) -> Result<(), StoreError> {
        let indexes = self.indexes.read().await;
        let mut docs = self.docs.write().await;
        Self::check_unique(&indexes, &docs, &doc)?;
        docs.push(doc);
        Ok(())
    }

    async fn insert_many(&self, new_docs: Vec<Document>) -> Result<(), StoreError> {
        let indexes = self.indexes.read().await;
        let mut docs = self.docs.write().await;
        for doc in new_docs {
            Self::check_unique(&indexes, &docs, &doc)?;
            docs.push(doc);
        }
        Ok(())
    }

    async fn update_one(&self, filter: Document, fields: Document) -> Result<u64, StoreError> {
        let mut docs = self.docs.write().await;
        match docs.iter_mut().find(|d| matches(d, &filter)) {
            Some(doc) => {
                for (field, value) in fields {
                    doc.insert(field, value);
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn update_many(&self, filter: Document, fields: Document) -> Result<u64, StoreError> {
        let mut docs = self.docs.write().await;
        let mut modified = 0;
        for doc in docs.iter_mut().filter(|d| matches(d, &filter)) {
            for (field, value) in &fields {
                doc.insert(field, value.clone());
            }
            modified += 1;
        }
        Ok(modified)
    }

    async fn delete_one(&self, filter: Document) -> Result<u64, StoreError> {
        let mut docs = self.docs.write().await;
        match docs.iter().position(|d| matches(d, &filter)) {
            Some(position) => {
                docs.remove(position);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, filter: Document) -> Result<u64, StoreError> {
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|d| !matches(d, &filter));
        Ok((before - docs.len()) as u64)
    }

    async fn distinct(&self, field: &str, filter: Document) -> Result<Vec<Bson>, StoreError> {
        let docs = self.docs.read().await;
        let mut values: Vec<Bson> = Vec::new();
        for doc in docs.iter().filter(|d| matches(d, &filter)) {
            match doc.get(field) {
                // Array fields contribute their elements, as the driver does.
                Some(Bson::Array(elements)) => {
                    for element in elements {
                        if !values.contains(element) {
                            values.push(element.clone());
                        }
                    }
                }
                Some(value) => {
                    if !values.contains(value) {
                        values.push(value.clone());
                    }
                }
                None => {}
            }
        }
        Ok(values)
    }

    async fn create_indexes(&self, new_indexes: &[IndexSpec]) -> Result<(), StoreError> {
        let mut indexes = self.indexes.write().await;
        for index in new_indexes {
            if !indexes.contains(index) {
                indexes.push(index.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{IndexDirection, sort_on};
    use bson::doc;

    fn collection() -> MemoryCollection {
        MemoryCollection::default()
    }

    #[tokio::test]
    async fn equality_and_in_filters() {
        let c = collection();
        c.insert_one(doc! { "_id": "1", "code": "A", "tags": ["x", "y"] })
            .await
            .unwrap();
        c.insert_one(doc! { "_id": "2", "code": "B", "tags": ["z"] })
            .await
            .unwrap();

        let hit = c.find_one(doc! { "code": "A" }).await.unwrap();
        assert_eq!(hit.unwrap().get_str("_id").unwrap(), "1");

        let hits = c
            .find_many(doc! { "_id": { "$in": ["1", "2"] } }, None, None, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);

        // $in against an array field matches on intersection.
        let hits = c
            .find_many(doc! { "tags": { "$in": ["y"] } }, None, None, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].get_str("_id").unwrap(), "1");
    }

    #[tokio::test]
    async fn unique_index_rejects_duplicates() {
        let c = collection();
        c.create_indexes(&[IndexSpec::ascending("code").unique()])
            .await
            .unwrap();
        c.insert_one(doc! { "_id": "1", "code": "A" }).await.unwrap();

        let err = c
            .insert_one(doc! { "_id": "2", "code": "A" })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(_)));
    }

    #[tokio::test]
    async fn index_provisioning_is_idempotent() {
        let c = collection();
        let spec = [IndexSpec::ascending("code").unique()];
        c.create_indexes(&spec).await.unwrap();
        c.create_indexes(&spec).await.unwrap();
        assert_eq!(c.indexes.read().await.len(), 1);
    }

    #[tokio::test]
    async fn sort_skip_limit() {
        let c = collection();
        for (id, rank) in [("a", 3), ("b", 1), ("c", 2)] {
            c.insert_one(doc! { "_id": id, "rank": rank }).await.unwrap();
        }

        let sorted = c
            .find_many(doc! {}, None, None, Some(sort_on("rank", IndexDirection::Descending)))
            .await
            .unwrap();
        let ids: Vec<&str> = sorted.iter().map(|d| d.get_str("_id").unwrap()).collect();
        assert_eq!(ids, ["a", "c", "b"]);

        let page = c
            .find_many(
                doc! {},
                Some(1),
                Some(1),
                Some(sort_on("rank", IndexDirection::Ascending)),
            )
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].get_str("_id").unwrap(), "c");
    }

    #[tokio::test]
    async fn distinct_flattens_arrays() {
        let c = collection();
        c.insert_one(doc! { "_id": "1", "zones": ["A", "B"] }).await.unwrap();
        c.insert_one(doc! { "_id": "2", "zones": ["B", "C"] }).await.unwrap();

        let values = c.distinct("zones", doc! {}).await.unwrap();
        assert_eq!(values.len(), 3);
    }
}
