//! Bearer-token identity.
//!
//! Tokens are HS256 JWTs whose subject is a user id. The token only proves
//! *who* the caller is: the role is read from the `users` table on every
//! request, so an [`Actor`] always reflects the stored record.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use solidarity_protocol::{Actor, Role};
use sqlx::SqlitePool;

use crate::api::AppState;
use crate::config::Config;
use crate::errors::{ApiError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    pub iat: i64,
    pub exp: i64,
}

/// Sign a token for `user_id`, valid for `config.token_ttl_hours`.
pub fn issue_token(config: &Config, user_id: i64) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp(),
        exp: (now + Duration::hours(config.token_ttl_hours)).timestamp(),
    };
    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    Ok(encode(&Header::new(Algorithm::HS256), &claims, &key)?)
}

/// Check signature and expiry. Any failure is an authentication error.
pub fn verify_token(config: &Config, token: &str) -> Result<Claims> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    decode::<Claims>(token, &key, &Validation::new(Algorithm::HS256))
        .map(|data| data.claims)
        .map_err(|e| ApiError::Auth(format!("invalid bearer token: {e}")))
}

/// Load the current role of `user_id`.
pub async fn resolve_actor(pool: &SqlitePool, user_id: i64) -> Result<Actor> {
    let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    let role: Role = role
        .ok_or_else(|| ApiError::Auth("token subject no longer exists".to_string()))?
        .parse()?;
    Ok(Actor::new(user_id, role))
}

fn bearer(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Extractor for an authenticated caller.
///
/// Use `Option<AuthUser>` on routes where authentication is optional.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Actor);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token =
            bearer(parts).ok_or_else(|| ApiError::Auth("missing bearer token".to_string()))?;
        let claims = verify_token(&state.config, token)?;
        let actor = resolve_actor(&state.pool, claims.sub).await?;
        Ok(AuthUser(actor))
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
