use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{
    take_id, with_id, DeleteResult, Document, DocumentId, DocumentStore, Filter, InsertOneResult,
    Projection, StoreError, StoreResult, UpdateResult, ID_FIELD,
};

/// Process-local store. Collections keep documents in insertion order.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<(DocumentId, Document)>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().await;
        let documents = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, body)| with_id(*id, body.clone()))
                    .filter(|doc| filter.matches(doc))
                    .collect()
            })
            .unwrap_or_default();
        Ok(documents)
    }

    async fn find_one(
        &self,
        collection: &str,
        id: DocumentId,
        projection: Option<&Projection>,
    ) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        let found = collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|(doc_id, _)| *doc_id == id))
            .map(|(doc_id, body)| with_id(*doc_id, body.clone()));

        Ok(match (found, projection) {
            (Some(document), Some(projection)) => Some(projection.apply(document)),
            (found, _) => found,
        })
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> StoreResult<InsertOneResult> {
        let id = take_id(&mut document)?;

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|(doc_id, _)| *doc_id == id) {
            return Err(StoreError::DuplicateId(id));
        }
        docs.push((id, document));

        Ok(InsertOneResult {
            acknowledged: true,
            inserted_id: id,
        })
    }

    async fn update_one(&self, collection: &str, id: DocumentId, mut set: Document) -> StoreResult<UpdateResult> {
        set.remove(ID_FIELD);

        let mut collections = self.collections.write().await;
        let Some(body) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|(doc_id, _)| *doc_id == id))
            .map(|(_, body)| body)
        else {
            return Ok(UpdateResult::new(0, 0));
        };

        let changed = set.iter().any(|(field, value)| body.get(field) != Some(value));
        if changed {
            body.extend(set);
        }

        Ok(UpdateResult::new(1, u64::from(changed)))
    }

    async fn delete_one(&self, collection: &str, id: DocumentId) -> StoreResult<DeleteResult> {
        let mut collections = self.collections.write().await;
        let deleted = match collections.get_mut(collection) {
            Some(docs) => match docs.iter().position(|(doc_id, _)| *doc_id == id) {
                Some(index) => {
                    docs.remove(index);
                    1
                }
                None => 0,
            },
            None => 0,
        };

        Ok(DeleteResult::new(deleted))
    }
}
