//! Authenticated self-service endpoints.

use axum::{
    Json,
    extract::Extension,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use sqlx::PgPool;

use super::auth::error::AuthError;
use super::auth::principal::require_auth;
use super::auth::types::{UserEnvelope, UserResponse};

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "Return the authenticated user.", body = UserEnvelope),
        (status = 401, description = "Missing or invalid session cookie."),
    ),
    tag = "me"
)]
pub async fn get_me(headers: HeaderMap, pool: Extension<PgPool>) -> Result<Response, AuthError> {
    let principal = require_auth(&headers, &pool).await?;

    let body = UserEnvelope {
        user: UserResponse {
            id: principal.user_id,
            name: principal.name,
            email: principal.email,
            role: principal.role,
        },
    };

    Ok(Json(body).into_response())
}
