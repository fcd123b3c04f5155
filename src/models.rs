use crate::auth::TokenService;
use crate::config::Config;
use crate::db::SharedStore;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub tokens: TokenService,
    pub config: Config,
}

impl AppState {
    pub fn new(store: SharedStore, config: Config) -> Self {
        let tokens = TokenService::from_config(&config.auth);
        Self { store, tokens, config }
    }
}

// API Request/Response types

/// Body of every structured failure.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct CheckoutQuery {
    pub email: Option<String>,
}

/// PATCH body; any other fields sent along are ignored.
#[derive(Debug, serde::Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub database: String,
}
