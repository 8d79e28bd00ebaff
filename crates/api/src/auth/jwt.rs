//! Bearer session tokens.
//!
//! Sessions are issued by the external auth provider as HS256 JWTs whose
//! `sub` is the provider's opaque user id. This service only validates them.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mu2mi_core::types::UserId;
use serde::{Deserialize, Serialize};

/// Claims carried by a session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject: the auth provider's user id.
    pub sub: UserId,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HMAC-SHA256 secret shared with the auth provider.
    pub secret: String,
}

impl SessionConfig {
    /// Load session configuration from environment variables.
    ///
    /// | Env Var          | Required | Default |
    /// |------------------|----------|---------|
    /// | `SESSION_SECRET` | **yes**  | --      |
    ///
    /// # Panics
    ///
    /// Panics if `SESSION_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("SESSION_SECRET").expect("SESSION_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "SESSION_SECRET must not be empty");
        Self { secret }
    }
}

/// Validate a session token, returning its claims.
///
/// Checks the signature and `exp`.
pub fn validate_token(
    token: &str,
    config: &SessionConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    )?;
    Ok(token_data.claims)
}

/// Sign a session token for `user_id` valid for `ttl_secs`. Used for local
/// development and tests; production sessions come from the auth provider.
pub fn issue_token(
    user_id: &str,
    ttl_secs: i64,
    config: &SessionConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + ttl_secs,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}
