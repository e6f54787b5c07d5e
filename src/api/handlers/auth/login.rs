//! Login and password bootstrap endpoints.
//!
//! Flow Overview (login): same-origin guard, then the rate limiter, then
//! credential verification, then session creation. The order is fixed; a
//! blocked pair never reaches the verifier, so an attacker cannot probe
//! passwords while locked out.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use std::sync::{Arc, OnceLock};
use subtle::ConstantTimeEq;
use tracing::info;

use super::{
    error::AuthError,
    hasher::{hash_password, verify_password},
    origin::ensure_same_origin,
    rate_limit::{LoginRateLimiter, RateLimitStatus},
    session::session_cookie,
    state::AuthState,
    storage::{create_session, lookup_user_by_email, set_password_by_email},
    types::{BootstrapRequest, BootstrapResponse, LoginRequest, UserEnvelope, UserResponse},
    utils::{ClientMeta, normalize_email, rate_limit_key},
};

/// Digest verified for unknown emails so the failure path burns the same
/// derivation cost as a wrong password.
fn unknown_user_digest() -> &'static str {
    static DIGEST: OnceLock<String> = OnceLock::new();
    DIGEST.get_or_init(|| {
        format!(
            "scrypt$32768$8$1${}${}",
            STANDARD.encode([0u8; 16]),
            STANDARD.encode([0u8; 64]),
        )
    })
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated; session cookie set", body = UserEnvelope),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid credentials; includes remaining attempts"),
        (status = 429, description = "Too many failed attempts for this email and client")
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, AuthError> {
    ensure_same_origin(&headers, auth_state.config().public_scheme())?;

    let email = normalize_email(&request.email);
    if email.is_empty() || request.password.is_empty() {
        return Err(AuthError::Validation(
            "Email and password are required.".to_string(),
        ));
    }

    let client = ClientMeta::from_headers(&headers);
    let limiter = LoginRateLimiter::new(pool.0.clone());
    let key = rate_limit_key(&email, client.ip_address.as_deref());

    let status = limiter.check(&key).await?;
    if status.blocked {
        return Err(AuthError::RateLimited {
            blocked_until: status.blocked_until,
        });
    }

    let user = lookup_user_by_email(&pool, &email).await?;
    let digest = user
        .as_ref()
        .and_then(|user| user.password_hash.clone())
        .unwrap_or_else(|| unknown_user_digest().to_string());

    let password = request.password;
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &digest))
        .await
        .context("password verification task failed")?;

    // Unknown email and wrong password take the same path: register the
    // failure and answer with the generic message.
    let user = match user {
        Some(user) if valid && user.password_hash.is_some() => user,
        _ => {
            let failed = limiter.register_failure(&key).await?;
            return Err(failed_login_error(failed));
        }
    };

    limiter.clear(&key).await?;

    let ttl_seconds = auth_state.config().session_ttl_seconds();
    let (token, _expires_at) = create_session(&pool, user.user_id, ttl_seconds, &client).await?;

    info!("User {} logged in", user.user_id);

    let mut response_headers = HeaderMap::new();
    let cookie = session_cookie(auth_state.config(), &token)
        .context("failed to build session cookie")?;
    response_headers.insert(SET_COOKIE, cookie);

    let body = UserEnvelope {
        user: UserResponse {
            id: user.user_id,
            name: user.name,
            email: user.email,
            role: user.role,
        },
    };

    Ok((StatusCode::OK, response_headers, Json(body)).into_response())
}

/// The triggering failure still answers 401; the block only gates later
/// attempts (scenario: the fifth wrong password sees `remainingAttempts: 0`,
/// the sixth sees 429).
fn failed_login_error(status: RateLimitStatus) -> AuthError {
    AuthError::BadCredentials {
        remaining_attempts: status.remaining_attempts,
    }
}

#[utoipa::path(
    patch,
    path = "/v1/auth/login",
    request_body = BootstrapRequest,
    responses(
        (status = 200, description = "Password set", body = BootstrapResponse),
        (status = 400, description = "Missing email or weak password"),
        (status = 403, description = "Bootstrap secret missing or wrong"),
        (status = 404, description = "No user with that email")
    ),
    tag = "auth"
)]
pub async fn bootstrap(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Json(request): Json<BootstrapRequest>,
) -> Result<Response, AuthError> {
    ensure_same_origin(&headers, auth_state.config().public_scheme())?;

    // The secret is environment-configured; when unset the endpoint is
    // effectively disabled.
    let Some(secret) = auth_state.config().bootstrap_secret() else {
        return Err(AuthError::Forbidden("Invalid bootstrap secret."));
    };
    let matches: bool = request
        .setup_secret
        .as_bytes()
        .ct_eq(secret.expose_secret().as_bytes())
        .into();
    if !matches {
        return Err(AuthError::Forbidden("Invalid bootstrap secret."));
    }

    let email = normalize_email(&request.email);
    if email.is_empty() || request.new_password.len() < 12 {
        return Err(AuthError::Validation(
            "Email and strong password (min 12 chars) are required.".to_string(),
        ));
    }

    let new_password = request.new_password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&new_password))
        .await
        .context("password hashing task failed")??;

    let Some(user) = set_password_by_email(&pool, &email, &password_hash).await? else {
        return Err(AuthError::NotFound("Unknown email."));
    };

    info!("Bootstrap password set for user {}", user.user_id);

    let body = BootstrapResponse {
        message: "Password updated.".to_string(),
        user: UserResponse {
            id: user.user_id,
            name: user.name,
            email: user.email,
            role: user.role,
        },
    };

    Ok((StatusCode::OK, Json(body)).into_response())
}
