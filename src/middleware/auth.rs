//! Request gates
//!
//! [`require_token`] runs as route middleware: it either attaches the verified
//! [`Identity`] to the request extensions or answers 401 itself.
//! [`authorize_owner`] is called by handlers that serve per-user records.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use tracing::{debug, warn};

use crate::auth::{Identity, TOKEN_COOKIE};
use crate::models::AppState;
use crate::types::AppError;

pub async fn require_token(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(TOKEN_COOKIE)
        .map(|cookie| cookie.value())
        .filter(|value| !value.is_empty())
        .ok_or(AppError::MissingToken)?;

    let identity = state.tokens.verify(token).map_err(|e| {
        warn!(uri = %req.uri(), error = ?e, "Rejected token");
        AppError::InvalidToken(e)
    })?;

    debug!(email = identity.email(), "Token verified");
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

/// Resolves which owner's records the caller may read.
///
/// An explicit `requested` email must equal the token's email. Without one the
/// caller's own email is used, so an omitted filter never widens the result.
pub fn authorize_owner<'a>(identity: &'a Identity, requested: Option<&str>) -> Result<&'a str, AppError> {
    let own = identity.email().ok_or(AppError::Forbidden)?;

    match requested {
        Some(email) if email != own => {
            warn!(token_email = own, requested = email, "Ownership check failed");
            Err(AppError::Forbidden)
        }
        _ => Ok(own),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util;
    use axum::{
        body::Body,
        http::{header, Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Extension, Router,
    };
    use chrono::{Duration, Utc};
    use serde_json::{json, Map, Value};

    fn identity(claims: Value) -> Identity {
        let Value::Object(map) = claims else { unreachable!() };
        Identity::new(map)
    }

    #[test]
    fn test_owner_matches() {
        let me = identity(json!({"email": "a@example.com"}));
        assert_eq!(authorize_owner(&me, Some("a@example.com")).unwrap(), "a@example.com");
    }

    #[test]
    fn test_owner_mismatch_is_forbidden() {
        let me = identity(json!({"email": "a@example.com"}));
        assert!(matches!(authorize_owner(&me, Some("b@example.com")), Err(AppError::Forbidden)));
    }

    #[test]
    fn test_missing_filter_defaults_to_own_email() {
        let me = identity(json!({"email": "a@example.com"}));
        assert_eq!(authorize_owner(&me, None).unwrap(), "a@example.com");
    }

    #[test]
    fn test_identity_without_email_is_forbidden() {
        let anonymous = identity(json!({"name": "nobody"}));
        assert!(matches!(authorize_owner(&anonymous, None), Err(AppError::Forbidden)));
        assert!(matches!(authorize_owner(&anonymous, Some("a@example.com")), Err(AppError::Forbidden)));
    }

    fn gated_app(state: AppState) -> Router {
        Router::new()
            .route(
                "/whoami",
                get(|Extension(identity): Extension<Identity>| async move {
                    identity.email().unwrap_or_default().to_string()
                }),
            )
            .layer(from_fn_with_state(state.clone(), require_token))
            .with_state(state)
    }

    fn whoami(cookie: Option<String>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri("/whoami");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_no_cookie_is_unauthorized_access() {
        let app = gated_app(test_util::state());
        let (status, body) = test_util::send(app, whoami(None)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"message": "unauthorized access"}));
    }

    #[tokio::test]
    async fn test_empty_cookie_is_unauthorized_access() {
        let app = gated_app(test_util::state());
        let (status, body) = test_util::send(app, whoami(Some("token=".into()))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"message": "unauthorized access"}));
    }

    #[tokio::test]
    async fn test_bad_token_is_unauthorized() {
        let app = gated_app(test_util::state());
        let (status, body) = test_util::send(app, whoami(Some("token=garbage".into()))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"message": "unauthorized"}));
    }

    #[tokio::test]
    async fn test_expired_token_is_unauthorized() {
        let state = test_util::state();
        let mut claims = Map::new();
        claims.insert("email".into(), json!("a@example.com"));
        let token = state
            .tokens
            .issue_at(claims, Utc::now() - Duration::hours(2))
            .unwrap();

        let app = gated_app(state);
        let (status, body) = test_util::send(app, whoami(Some(format!("token={token}")))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"message": "unauthorized"}));
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler_with_identity() {
        let state = test_util::state();
        let token = test_util::token_for(&state, "a@example.com");

        let app = gated_app(state);
        let cookie = format!("theme=dark; token={token}");
        let (status, body) = test_util::send(app, whoami(Some(cookie))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("a@example.com"));
    }
}
