// Helpers for driving the router in tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::config::Config;
use crate::db::MemoryDocumentStore;
use crate::models::AppState;

pub(crate) const SECRET: &str = "test-secret";

pub(crate) fn config() -> Config {
    Config::from_lookup(|key| match key {
        "ACCESS_TOKEN_SECRET" => Some(SECRET.to_string()),
        "STORE_BACKEND" => Some("memory".to_string()),
        _ => None,
    })
    .expect("test config")
}

pub(crate) fn state() -> AppState {
    AppState::new(Arc::new(MemoryDocumentStore::new()), config())
}

pub(crate) fn token_for(state: &AppState, email: &str) -> String {
    let mut claims = Map::new();
    claims.insert("email".to_string(), Value::String(email.to_string()));
    state.tokens.issue(claims).expect("issue token")
}

pub(crate) fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub(crate) fn empty_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// Sends one request; the body comes back as JSON, or as a JSON string when
/// it is not JSON.
pub(crate) async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send_full(app, req).await;
    (status, body)
}

pub(crate) async fn send_full(app: Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    (status, headers, body)
}
