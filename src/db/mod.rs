//! Document store
//!
//! Handlers talk to a [`DocumentStore`]: named collections of JSON documents,
//! each addressed by a [`DocumentId`] exposed as the `_id` field.
//!
//! - [`PgDocumentStore`] keeps every collection in one JSONB table
//! - [`MemoryDocumentStore`] keeps them in process memory

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

pub mod memory;
pub mod pool;
pub mod postgres;

pub use memory::MemoryDocumentStore;
pub use pool::*;
pub use postgres::PgDocumentStore;

use crate::config::{DatabaseConfig, StoreBackend};

pub const SERVICES: &str = "services";
pub const CHECKOUTS: &str = "checkouts";

/// Field holding a document's identifier.
pub const ID_FIELD: &str = "_id";

pub type Document = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("duplicate id: {0}")]
    DuplicateId(DocumentId),

    #[error("stored document is not an object: {0}")]
    Corrupt(DocumentId),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for DocumentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for DocumentId {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| StoreError::InvalidId(s.to_string()))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for DocumentId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Equality match on top-level fields. An empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct Filter(Document);

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn equals(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn as_document(&self) -> &Document {
        &self.0
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.0
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }
}

/// Field whitelist applied to read results. `_id` always survives.
#[derive(Debug, Clone)]
pub struct Projection(Vec<String>);

impl Projection {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    pub fn apply(&self, mut document: Document) -> Document {
        document.retain(|field, _| field == ID_FIELD || self.0.iter().any(|f| f == field));
        document
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOneResult {
    pub acknowledged: bool,
    pub inserted_id: DocumentId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    pub upserted_id: Option<DocumentId>,
}

impl UpdateResult {
    pub fn new(matched_count: u64, modified_count: u64) -> Self {
        Self {
            acknowledged: true,
            matched_count,
            modified_count,
            upserted_count: 0,
            upserted_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl DeleteResult {
    pub fn new(deleted_count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
        }
    }
}

/// Each call touches at most one document and is atomic on its own.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    /// Matching documents in insertion order.
    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>>;

    async fn find_one(
        &self,
        collection: &str,
        id: DocumentId,
        projection: Option<&Projection>,
    ) -> StoreResult<Option<Document>>;

    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<InsertOneResult>;

    /// Merges `set` into the document's top-level fields.
    async fn update_one(&self, collection: &str, id: DocumentId, set: Document) -> StoreResult<UpdateResult>;

    async fn delete_one(&self, collection: &str, id: DocumentId) -> StoreResult<DeleteResult>;
}

pub type SharedStore = Arc<dyn DocumentStore>;

/// Splits a caller-supplied `_id` off a new document, or allocates one.
pub(crate) fn take_id(document: &mut Document) -> StoreResult<DocumentId> {
    match document.remove(ID_FIELD) {
        None | Some(Value::Null) => Ok(DocumentId::new()),
        Some(Value::String(raw)) => raw.parse(),
        Some(other) => Err(StoreError::InvalidId(other.to_string())),
    }
}

/// Exposes the stored identifier as the `_id` field of a body.
pub(crate) fn with_id(id: DocumentId, body: Document) -> Document {
    let mut document = Document::with_capacity(body.len() + 1);
    document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    document.extend(body.into_iter().filter(|(field, _)| field != ID_FIELD));
    document
}

/// Opens the store selected by configuration and checks it answers.
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<SharedStore> {
    let store: SharedStore = match config.backend {
        StoreBackend::Postgres => {
            let pool = create_pool(config).await?;
            let store = PgDocumentStore::new(pool);
            store.migrate().await?;
            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory document store; data is lost on restart");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    store.ping().await?;
    Ok(store)
}
