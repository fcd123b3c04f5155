use axum::{extract::State, middleware::from_fn, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{Map, Value};
use tracing::info;

use crate::auth::TOKEN_COOKIE;
use crate::middleware::log_request;
use crate::models::{AppState, SuccessResponse};
use crate::types::{ApiJson, AppError, AppResult};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jwt", post(issue_token).route_layer(from_fn(log_request)))
        .route("/logout", post(logout))
}

/// Cross-site, script-invisible cookie; the client and API live on
/// different origins.
fn token_cookie(value: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .path("/")
        .build()
}

/// POST /jwt - sign the posted identity and hand it back as a cookie
async fn issue_token(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<Map<String, Value>>,
) -> AppResult<(CookieJar, Json<SuccessResponse>)> {
    let email = payload.get("email").and_then(Value::as_str).map(str::to_owned);
    let token = state
        .tokens
        .issue(payload)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    info!(email = ?email, "Issued token");

    Ok((jar.add(token_cookie(token)), Json(SuccessResponse::ok())))
}

/// POST /logout - expire the token cookie
async fn logout(jar: CookieJar) -> (CookieJar, Json<SuccessResponse>) {
    let mut removal = token_cookie(String::new());
    removal.make_removal();

    (jar.add(removal), Json(SuccessResponse::ok()))
}
