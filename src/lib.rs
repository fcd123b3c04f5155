// Car Doctor - service catalog and checkout API

pub mod auth;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod types;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_util;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
