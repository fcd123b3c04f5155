use axum::{
    extract::State,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Extension, Json, Router,
};
use serde_json::Value;
use tracing::info;

use crate::auth::Identity;
use crate::db::{DeleteResult, Document, DocumentId, Filter, InsertOneResult, UpdateResult, CHECKOUTS};
use crate::middleware::{authorize_owner, log_request, require_token};
use crate::models::{AppState, CheckoutQuery, StatusUpdate};
use crate::types::{ApiJson, ApiPath, ApiQuery, AppResult};

/// The listing is the only gated route; the gates run logger first, then token.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/checkouts",
            get(list_checkouts)
                .route_layer(from_fn_with_state(state, require_token))
                .route_layer(from_fn(log_request)),
        )
        .route("/checkouts", post(create_checkout))
        .route("/checkouts/{id}", patch(update_status).delete(delete_checkout))
}

async fn create_checkout(
    State(state): State<AppState>,
    ApiJson(checkout): ApiJson<Document>,
) -> AppResult<Json<InsertOneResult>> {
    let result = state.store.insert_one(CHECKOUTS, checkout).await?;
    info!(id = %result.inserted_id, "Checkout created");
    Ok(Json(result))
}

/// GET /checkouts?email= - the caller's own checkouts
async fn list_checkouts(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiQuery(query): ApiQuery<CheckoutQuery>,
) -> AppResult<Json<Vec<Document>>> {
    let owner = authorize_owner(&identity, query.email.as_deref())?;
    let checkouts = state
        .store
        .find(CHECKOUTS, &Filter::all().equals("email", owner))
        .await?;
    Ok(Json(checkouts))
}

async fn delete_checkout(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> AppResult<Json<DeleteResult>> {
    let id: DocumentId = id.parse()?;
    let result = state.store.delete_one(CHECKOUTS, id).await?;
    info!(%id, deleted = result.deleted_count, "Checkout delete");
    Ok(Json(result))
}

/// PATCH /checkouts/{id} - replace the status field only
async fn update_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> AppResult<Json<UpdateResult>> {
    let id: DocumentId = id.parse()?;
    let mut set = Document::new();
    set.insert("status".to_string(), Value::String(update.status));

    let result = state.store.update_one(CHECKOUTS, id, set).await?;
    info!(%id, matched = result.matched_count, modified = result.modified_count, "Checkout status update");
    Ok(Json(result))
}
