//! Identity tokens
//!
//! Tokens are HS256 JWTs signed with the process secret. The claims are the
//! caller-supplied identity payload plus `iat`/`exp`.

pub mod token;

pub use token::{AuthError, Claims, Identity, TokenService};

/// Cookie carrying the identity token.
pub const TOKEN_COOKIE: &str = "token";
