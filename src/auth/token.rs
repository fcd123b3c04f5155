use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::AuthConfig;

/// Lifetime of every issued token.
pub const TOKEN_TTL_SECS: i64 = 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid or expired token")]
    InvalidOrExpired(#[source] jsonwebtoken::errors::Error),

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Signed claims: the identity payload flattened next to the timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub payload: Map<String, Value>,
    pub iat: i64,
    pub exp: i64,
}

/// Verified caller identity attached to a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Identity(Map<String, Value>);

impl Identity {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(Value::as_str)
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Issues and verifies identity tokens. Owns the signing keys.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // Payloads are caller-defined; an `aud` claim in them is just data.
        validation.validate_aud = false;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.secret)
    }

    pub fn issue(&self, payload: Map<String, Value>) -> Result<String, AuthError> {
        self.issue_at(payload, Utc::now())
    }

    /// Signs `payload` as if issued at `issued_at`. Caller-supplied `iat`
    /// and `exp` are replaced.
    pub fn issue_at(&self, mut payload: Map<String, Value>, issued_at: DateTime<Utc>) -> Result<String, AuthError> {
        payload.remove("iat");
        payload.remove("exp");

        let claims = Claims {
            payload,
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::seconds(TOKEN_TTL_SECS)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(AuthError::Signing)
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(AuthError::InvalidOrExpired)
    }

    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.decode(token).map(|claims| Identity::new(claims.payload))
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn service() -> TokenService {
        TokenService::new("test-secret")
    }

    fn payload(email: &str) -> Map<String, Value> {
        let Value::Object(map) = json!({"email": email, "name": "Rahim"}) else {
            unreachable!()
        };
        map
    }

    #[test]
    fn test_issue_then_verify_returns_payload() {
        let tokens = service();
        let token = assert_ok!(tokens.issue(payload("rahim@example.com")));

        let identity = assert_ok!(tokens.verify(&token));
        assert_eq!(identity.claims(), &payload("rahim@example.com"));
        assert_eq!(identity.email(), Some("rahim@example.com"));
    }

    #[test]
    fn test_expiry_is_one_hour_after_issue() {
        let tokens = service();
        let issued_at = Utc::now();
        let token = tokens.issue_at(payload("a@example.com"), issued_at).unwrap();

        let claims = tokens.decode(&token).unwrap();
        assert_eq!(claims.iat, issued_at.timestamp());
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_token_valid_just_before_expiry() {
        let tokens = service();
        let issued_at = Utc::now() - Duration::minutes(59);
        let token = tokens.issue_at(payload("a@example.com"), issued_at).unwrap();

        assert_ok!(tokens.verify(&token));
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = service();
        let issued_at = Utc::now() - Duration::hours(2);
        let token = tokens.issue_at(payload("a@example.com"), issued_at).unwrap();

        let err = assert_err!(tokens.verify(&token));
        assert!(matches!(err, AuthError::InvalidOrExpired(_)));
    }

    #[test]
    fn test_caller_cannot_extend_expiry() {
        let tokens = service();
        let mut claims = payload("a@example.com");
        claims.insert("exp".to_string(), json!(i64::MAX / 2));
        claims.insert("iat".to_string(), json!(0));

        let token = tokens.issue_at(claims, Utc::now() - Duration::hours(2)).unwrap();
        assert_err!(tokens.verify(&token));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = service().issue(payload("a@example.com")).unwrap();
        let other = TokenService::new("another-secret");

        assert_err!(other.verify(&token));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let tokens = service();
        let token = tokens.issue(payload("a@example.com")).unwrap();
        let forged = tokens.issue(payload("b@example.com")).unwrap();

        // Splice b's claims under a's signature.
        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);
        assert_err!(tokens.verify(&spliced));

        // Flip one signature character.
        let mut signature: Vec<char> = parts[2].chars().collect();
        signature[5] = if signature[5] == 'A' { 'B' } else { 'A' };
        let flipped = format!("{}.{}.{}", parts[0], parts[1], signature.into_iter().collect::<String>());
        assert_err!(tokens.verify(&flipped));
    }

    #[test]
    fn test_malformed_token_rejected() {
        let tokens = service();
        for garbage in ["", "abc", "a.b.c", "not-a-jwt.at.all"] {
            assert_err!(tokens.verify(garbage));
        }
    }
}
