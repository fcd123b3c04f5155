use axum::{extract::Request, middleware::Next, response::Response};
use tracing::info;

/// Logs method and URI before handing the request on.
pub async fn log_request(req: Request, next: Next) -> Response {
    info!(method = %req.method(), uri = %req.uri(), "logger");
    next.run(req).await
}
