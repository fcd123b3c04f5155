use axum::{extract::State, routing::get, Json, Router};

use crate::db::{Document, DocumentId, Filter, Projection, SERVICES};
use crate::models::AppState;
use crate::types::{ApiPath, AppResult};

/// Fields returned by the single-service lookup, besides `_id`.
const SERVICE_SUMMARY_FIELDS: [&str; 4] = ["service_id", "title", "price", "img"];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/services", get(list_services))
        .route("/services/{id}", get(get_service))
}

async fn list_services(State(state): State<AppState>) -> AppResult<Json<Vec<Document>>> {
    let services = state.store.find(SERVICES, &Filter::all()).await?;
    Ok(Json(services))
}

/// GET /services/{id} - summary of one service, `null` when unknown
async fn get_service(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> AppResult<Json<Option<Document>>> {
    let id: DocumentId = id.parse()?;
    let projection = Projection::new(SERVICE_SUMMARY_FIELDS);
    let service = state.store.find_one(SERVICES, id, Some(&projection)).await?;
    Ok(Json(service))
}
