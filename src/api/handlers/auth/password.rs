//! Authenticated password change.
//!
//! A successful change revokes every active session for the user, including
//! the one that made the request, and clears the caller's cookie; the next
//! request must log in with the new password.

use anyhow::Context;
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use super::{
    error::AuthError,
    hasher::{hash_password, verify_password},
    origin::ensure_same_origin,
    principal::require_auth,
    session::clear_session_cookie,
    state::AuthState,
    storage::{fetch_password_hash, revoke_user_sessions, update_password},
    types::{MessageResponse, PasswordChangeRequest},
    utils::validate_password_policy,
};

#[utoipa::path(
    patch,
    path = "/v1/auth/password",
    request_body = PasswordChangeRequest,
    responses(
        (status = 200, description = "Password changed; all sessions revoked", body = MessageResponse),
        (status = 400, description = "Policy violation or reused password"),
        (status = 401, description = "Missing session or wrong current password")
    ),
    tag = "auth"
)]
pub async fn change_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Json(request): Json<PasswordChangeRequest>,
) -> Result<Response, AuthError> {
    ensure_same_origin(&headers, auth_state.config().public_scheme())?;

    let principal = require_auth(&headers, &pool).await?;

    if request.current_password.is_empty() || request.new_password.is_empty() {
        return Err(AuthError::Validation(
            "currentPassword and newPassword are required.".to_string(),
        ));
    }

    validate_password_policy(&request.new_password)
        .map_err(|message| AuthError::Validation(message.to_string()))?;

    let Some(stored) = fetch_password_hash(&pool, principal.user_id).await? else {
        return Err(AuthError::Validation(
            "Password record not found.".to_string(),
        ));
    };

    // Re-verify the current password and check reuse in one blocking hop;
    // both run the stored record's full derivation cost.
    let current_password = request.current_password;
    let new_password = request.new_password;
    let (current_ok, reused, new_hash) = tokio::task::spawn_blocking(move || {
        let current_ok = verify_password(&current_password, &stored);
        if !current_ok {
            return (false, false, None);
        }
        let reused = verify_password(&new_password, &stored);
        if reused {
            return (true, true, None);
        }
        (true, false, Some(hash_password(&new_password)))
    })
    .await
    .context("password change task failed")?;

    if !current_ok {
        return Err(AuthError::Unauthorized("Current password is incorrect."));
    }
    if reused {
        return Err(AuthError::Validation(
            "New password must be different from current password.".to_string(),
        ));
    }
    let new_hash = new_hash
        .transpose()?
        .context("password change produced no digest")?;

    // Digest swap and revoke-all commit or fail together.
    let mut tx = pool
        .begin()
        .await
        .context("begin password change transaction")?;
    update_password(&mut tx, principal.user_id, &new_hash).await?;
    let revoked = revoke_user_sessions(&mut tx, principal.user_id).await?;
    tx.commit()
        .await
        .context("commit password change transaction")?;

    info!(
        "Password changed for user {}; {revoked} session(s) revoked",
        principal.user_id
    );

    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }

    let body = MessageResponse {
        message: "Password changed successfully. Please log in again.".to_string(),
    };

    Ok((StatusCode::OK, response_headers, Json(body)).into_response())
}
