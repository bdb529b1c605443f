//! Password hashing, token issuance/verification and the authenticated-user
//! extractor.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use domain::User;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

/// bcrypt cost factor (salt rounds).
const BCRYPT_COST: u32 = 10;

/// Token lifetime: 7 days.
const TOKEN_TTL_DAYS: i64 = 7;

/// Errors from the auth primitives.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// Claims carried in a signed token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub roles: Vec<String>,
    /// Expiry, seconds since epoch.
    pub exp: i64,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
}

/// Hashes a plaintext password with bcrypt.
pub fn hash_password(plaintext: &str) -> Result<String, AuthError> {
    Ok(bcrypt::hash(plaintext, BCRYPT_COST)?)
}

/// Verifies a plaintext password against a stored hash.
pub fn verify_password(plaintext: &str, hash: &str) -> Result<bool, AuthError> {
    Ok(bcrypt::verify(plaintext, hash)?)
}

/// Issues a signed token for a user with a 7-day expiry.
pub fn issue_token(user: &User, secret: &str) -> Result<String, AuthError> {
    issue_token_with_ttl(user, secret, Duration::days(TOKEN_TTL_DAYS))
}

fn issue_token_with_ttl(user: &User, secret: &str, ttl: Duration) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        roles: user.roles.clone(),
        exp: (now + ttl).timestamp(),
        iat: now.timestamp(),
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Verifies a token's signature and expiry and returns its claims.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// The authenticated caller, decoded from a bearer token or the `token`
/// cookie.
///
/// Any failure is terminal for the request: 401 with one of the two generic
/// messages, never a hint about which check failed.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Extracts the `token` cookie as a fallback for browser clients.
fn cookie_token(parts: &Parts) -> Option<String> {
    let cookies = parts.headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == "token").then(|| value.to_string())
    })
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .or_else(|| cookie_token(parts))
            .ok_or(ApiError::Unauthorized("Authentication required"))?;

        let claims = verify_token(&token, &state.config.jwt_secret)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token"))?;
        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token"))?;

        Ok(AuthUser {
            id,
            email: claims.email,
            roles: claims.roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User::new("Golda", "Mensah", "golda@example.com", "hash", None)
    }

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert_ne!(hash, "correct horse battery staple");
        assert!(verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn token_round_trip_carries_claims() {
        let user = sample_user();
        let token = issue_token(&user, "secret").unwrap();
        let claims = verify_token(&token, "secret").unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, "golda@example.com");
        assert_eq!(claims.roles, vec!["customer".to_string()]);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn token_with_wrong_secret_is_rejected() {
        let token = issue_token(&sample_user(), "secret").unwrap();
        assert!(verify_token(&token, "other-secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token =
            issue_token_with_ttl(&sample_user(), "secret", Duration::days(-1)).unwrap();
        assert!(verify_token(&token, "secret").is_err());
    }

    #[test]
    fn cookie_parser_finds_token_among_other_cookies() {
        let request = axum::http::Request::builder()
            .header(header::COOKIE, "session=abc; token=the-token; theme=dark")
            .body(())
            .unwrap();
        let (parts, ()) = request.into_parts();
        assert_eq!(cookie_token(&parts).as_deref(), Some("the-token"));
    }
}
