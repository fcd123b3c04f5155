use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    take_id, with_id, DeleteResult, Document, DocumentId, DocumentStore, Filter, InsertOneResult,
    Projection, StoreError, StoreResult, UpdateResult,
};

/// Collections stored as rows of the `documents` table.
///
/// Filters use JSONB containment (`@>`), which is plain equality for the
/// scalar fields the API filters on.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }
}

fn into_document(id: Uuid, body: Value) -> StoreResult<Document> {
    let id = DocumentId::from(id);
    match body {
        Value::Object(map) => Ok(with_id(id, map)),
        _ => Err(StoreError::Corrupt(id)),
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn ping(&self) -> StoreResult<()> {
        super::health_check(&self.pool).await?;
        Ok(())
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
        let rows: Vec<(Uuid, Value)> = sqlx::query_as(
            r#"
            SELECT id, body FROM documents
            WHERE collection = $1 AND body @> $2
            ORDER BY seq ASC
            "#,
        )
        .bind(collection)
        .bind(Json(filter.as_document()))
        .fetch_all(&self.pool)
        .await?;

        debug!(collection, count = rows.len(), "find");

        rows.into_iter()
            .map(|(id, body)| into_document(id, body))
            .collect()
    }

    async fn find_one(
        &self,
        collection: &str,
        id: DocumentId,
        projection: Option<&Projection>,
    ) -> StoreResult<Option<Document>> {
        let row: Option<(Uuid, Value)> = sqlx::query_as(
            "SELECT id, body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, body)| {
            let document = into_document(id, body)?;
            Ok(match projection {
                Some(projection) => projection.apply(document),
                None => document,
            })
        })
        .transpose()
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> StoreResult<InsertOneResult> {
        let id = take_id(&mut document)?;

        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(id.as_uuid())
            .bind(Json(&document))
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::DuplicateId(id),
                other => StoreError::Database(other),
            })?;

        debug!(collection, %id, "insert_one");

        Ok(InsertOneResult {
            acknowledged: true,
            inserted_id: id,
        })
    }

    async fn update_one(&self, collection: &str, id: DocumentId, mut set: Document) -> StoreResult<UpdateResult> {
        // The identifier is not part of the body and cannot be rewritten.
        set.remove(super::ID_FIELD);

        let (matched, modified): (i64, i64) = sqlx::query_as(
            r#"
            WITH target AS (
                SELECT id, body FROM documents WHERE collection = $1 AND id = $2
            ),
            updated AS (
                UPDATE documents d
                SET body = d.body || $3, updated_at = NOW()
                FROM target t
                WHERE d.collection = $1 AND d.id = t.id AND NOT (t.body @> $3)
                RETURNING d.id
            )
            SELECT (SELECT COUNT(*) FROM target), (SELECT COUNT(*) FROM updated)
            "#,
        )
        .bind(collection)
        .bind(id.as_uuid())
        .bind(Json(&set))
        .fetch_one(&self.pool)
        .await?;

        debug!(collection, %id, matched, modified, "update_one");

        Ok(UpdateResult::new(matched as u64, modified as u64))
    }

    async fn delete_one(&self, collection: &str, id: DocumentId) -> StoreResult<DeleteResult> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        debug!(collection, %id, deleted = result.rows_affected(), "delete_one");

        Ok(DeleteResult::new(result.rows_affected()))
    }
}
