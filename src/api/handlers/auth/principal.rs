//! Authenticated principal extraction and authorization helpers.
//!
//! Flow Overview: read the session cookie, resolve it to a user, and return a
//! principal that downstream handlers can use. Role checks are flat
//! membership tests against the closed `UserRole` set; there is no hierarchy.

use axum::http::HeaderMap;
use sqlx::PgPool;

use super::error::AuthError;
use super::session::extract_session_token;
use super::storage::lookup_session;
use super::types::UserRole;
use super::utils::hash_session_token;

/// Authenticated user context derived from the session cookie.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: uuid::Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

/// Resolve the session cookie into a principal, or 401 for missing sessions.
///
/// The rejection carries no detail; a malformed, unknown, expired, and
/// revoked token all look the same from outside.
///
/// # Errors
/// `Unauthorized` when no valid session is presented, `Internal` on store
/// failures.
pub async fn require_auth(headers: &HeaderMap, pool: &PgPool) -> Result<Principal, AuthError> {
    let Some(token) = extract_session_token(headers) else {
        return Err(AuthError::Unauthorized("Unauthorized."));
    };

    let token_hash = hash_session_token(&token);
    match lookup_session(pool, &token_hash).await? {
        Some(record) => Ok(Principal {
            user_id: record.user_id,
            name: record.name,
            email: record.email,
            role: record.role,
        }),
        None => Err(AuthError::Unauthorized("Unauthorized.")),
    }
}

/// Authenticate and then require one of `allowed_roles`.
///
/// # Errors
/// Propagates `require_auth` rejections; `Forbidden` when the authenticated
/// role is not in the allowed set.
pub async fn require_role(
    headers: &HeaderMap,
    pool: &PgPool,
    allowed_roles: &[UserRole],
) -> Result<Principal, AuthError> {
    let principal = require_auth(headers, pool).await?;

    if !allowed_roles.contains(&principal.role) {
        return Err(AuthError::Forbidden("Forbidden."));
    }

    Ok(principal)
}
