//! API Routes
//!
//! - `/` and `/health` - liveness
//! - `/jwt`, `/logout` - token cookie issue and removal
//! - `/services` - read-only catalog
//! - `/checkouts` - customer orders; listing is token-gated

pub mod auth;
pub mod checkouts;
pub mod health;
pub mod services;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::apply_cors;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let allowed_origins = state.config.server.cors_allowed_origins.clone();

    let router = Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(services::router())
        .merge(checkouts::router(state.clone()))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    apply_cors(router, &allowed_origins)
}
