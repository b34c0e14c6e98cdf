/**
 * Session Tokens
 *
 * HS256 JWTs whose `sub` is the user's UUID. Tokens are issued by the
 * account service; this server only verifies them. `create_token` exists
 * for tooling and tests.
 */

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Tokens expire after 30 days
const TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("token subject is not a user id")]
    BadSubject,
}

/// Create a JWT token for a user
pub fn create_token(user_id: Uuid, secret: &str) -> Result<String, TokenError> {
    let now = Utc::now().timestamp().max(0) as u64;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + TOKEN_TTL_SECS,
        iat: now,
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    Ok(encode(&Header::default(), &claims, &key)?)
}

/// Verify and decode a JWT token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &key, &Validation::default())?;
    Ok(token_data.claims)
}

/// Verify a token and return the user it was issued to
pub fn user_id_from_token(token: &str, secret: &str) -> Result<Uuid, TokenError> {
    let claims = verify_token(token, secret)?;
    Uuid::parse_str(&claims.sub).map_err(|_| TokenError::BadSubject)
}
