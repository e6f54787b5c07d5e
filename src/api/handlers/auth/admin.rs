//! Role-gated user provisioning and administrative updates.
//!
//! These are the provisioning entry points the data model assumes: users are
//! created here (or by seed tooling), and an administrative password reset
//! stamps the digest and revokes the target's sessions.

use anyhow::Context;
use axum::{
    Json,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::SecondsFormat;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{
    error::AuthError,
    hasher::hash_password,
    origin::ensure_same_origin,
    principal::require_role,
    state::AuthState,
    storage::{AdminUserRecord, CreateUserOutcome, admin_update_user, insert_user,
        revoke_user_sessions},
    types::{AdminUserEnvelope, AdminUserResponse, CreateUserRequest, UpdateUserRequest, UserRole},
    utils::{normalize_email, valid_email},
};

const WRITE_ROLES: &[UserRole] = &[UserRole::SuperAdmin, UserRole::ItManager];

#[utoipa::path(
    post,
    path = "/v1/auth/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User provisioned", body = AdminUserEnvelope),
        (status = 400, description = "Missing field, invalid role, or weak password"),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
        (status = 409, description = "Email already in use")
    ),
    tag = "auth"
)]
pub async fn create_user(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Response, AuthError> {
    ensure_same_origin(&headers, auth_state.config().public_scheme())?;

    let admin = require_role(&headers, &pool, WRITE_ROLES).await?;

    let name = request.name.trim().to_string();
    let email = normalize_email(&request.email);
    let role_label = request.role.trim();
    if name.is_empty() || email.is_empty() || role_label.is_empty() || request.password.is_empty() {
        return Err(AuthError::Validation(
            "name, email, role, and password are required.".to_string(),
        ));
    }

    let role: UserRole = role_label
        .parse()
        .map_err(|()| AuthError::Validation("Invalid role.".to_string()))?;

    if !valid_email(&email) {
        return Err(AuthError::Validation("Invalid email.".to_string()));
    }

    if request.password.len() < 12 {
        return Err(AuthError::Validation(
            "Password must be at least 12 characters.".to_string(),
        ));
    }

    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("password hashing task failed")??;

    let record = match insert_user(&pool, &name, &email, role, &password_hash).await? {
        CreateUserOutcome::Created(record) => record,
        CreateUserOutcome::Conflict => {
            return Err(AuthError::Conflict(
                "A user with this email already exists.".to_string(),
            ));
        }
    };

    info!("User {} provisioned by {}", record.user_id, admin.user_id);

    Ok((
        StatusCode::CREATED,
        Json(AdminUserEnvelope {
            data: to_response(record),
        }),
    )
        .into_response())
}

#[utoipa::path(
    patch,
    path = "/v1/auth/admin/users/{user_id}",
    request_body = UpdateUserRequest,
    params(
        ("user_id" = Uuid, Path, description = "User to update")
    ),
    responses(
        (status = 200, description = "User updated", body = AdminUserEnvelope),
        (status = 400, description = "No fields, invalid role, or weak password"),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
        (status = 404, description = "No such user")
    ),
    tag = "auth"
)]
pub async fn update_user(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Response, AuthError> {
    ensure_same_origin(&headers, auth_state.config().public_scheme())?;

    let admin = require_role(&headers, &pool, WRITE_ROLES).await?;

    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let role = match request.role.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(label) => Some(
            label
                .parse::<UserRole>()
                .map_err(|()| AuthError::Validation("Invalid role.".to_string()))?,
        ),
    };
    let password = request.password.as_deref().filter(|value| !value.is_empty());

    if name.is_none() && role.is_none() && password.is_none() {
        return Err(AuthError::Validation(
            "At least one field is required for update.".to_string(),
        ));
    }

    if let Some(password) = password {
        if password.len() < 12 {
            return Err(AuthError::Validation(
                "Password must be at least 12 characters.".to_string(),
            ));
        }
    }

    let password_hash = match password {
        Some(password) => {
            let password = password.to_string();
            Some(
                tokio::task::spawn_blocking(move || hash_password(&password))
                    .await
                    .context("password hashing task failed")??,
            )
        }
        None => None,
    };

    // A reset forces re-authentication everywhere; the revoke rides the same
    // transaction as the digest swap.
    let mut tx = pool.begin().await.context("begin user update transaction")?;
    let Some(record) =
        admin_update_user(&mut tx, user_id, name, role, password_hash.as_deref()).await?
    else {
        return Err(AuthError::NotFound("Unknown user."));
    };
    if password_hash.is_some() {
        revoke_user_sessions(&mut tx, user_id).await?;
    }
    tx.commit().await.context("commit user update transaction")?;

    info!("User {} updated by {}", user_id, admin.user_id);

    Ok((
        StatusCode::OK,
        Json(AdminUserEnvelope {
            data: to_response(record),
        }),
    )
        .into_response())
}

fn to_response(record: AdminUserRecord) -> AdminUserResponse {
    AdminUserResponse {
        id: record.user_id,
        name: record.name,
        email: record.email,
        role: record.role,
        password_updated_at: record
            .password_updated_at
            .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        created_at: record.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}
