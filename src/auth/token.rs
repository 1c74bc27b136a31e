//! Session token issuance and validation.
//!
//! HS256 JWTs with a fixed TTL. The subject is the user ID serialized as a
//! string. Tokens are stateless: there is no revocation list, so logout is
//! advisory and a compromised token stays valid until natural expiry.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;

/// JWT claims embedded in every session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user ID as a UUID string.
    pub sub: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Unique token ID.
    pub jti: String,
}

/// Token validation failures.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("token encoding failed: {0}")]
    Encode(String),
}

/// Issue a signed session token for the given user.
pub fn issue(user_id: Uuid, config: &AppConfig) -> Result<String, TokenError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + (config.token_ttl_hours * 3600) as i64,
        jti: Uuid::new_v4().to_string(),
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key)
        .map_err(|e| TokenError::Encode(e.to_string()))
}

/// Verify signature and expiry, returning the claims.
pub fn decode(token: &str, config: &AppConfig) -> Result<Claims, TokenError> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["sub", "exp", "iat"]);

    jsonwebtoken::decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        })
}

/// Decode the subject claim back into a user ID.
pub fn subject_user_id(claims: &Claims) -> Result<Uuid, TokenError> {
    claims
        .sub
        .parse()
        .map_err(|_| TokenError::Invalid(format!("subject is not a UUID: '{}'", claims.sub)))
}
