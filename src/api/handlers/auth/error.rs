//! Typed error taxonomy for the auth core.
//!
//! Every expected failure mode maps to a stable status code and a JSON body;
//! unexpected storage or hashing failures collapse into a generic 500 with
//! full detail going to the logs only. Credential failures are deliberately
//! generic so "user not found" and "wrong password" are indistinguishable.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),
    /// Missing or invalid session, or a failed re-authentication.
    #[error("{0}")]
    Unauthorized(&'static str),
    /// Failed login attempt; carries the remaining attempt budget.
    #[error("Invalid credentials.")]
    BadCredentials { remaining_attempts: i64 },
    /// Authenticated but the role is not permitted, or a bad bootstrap secret.
    #[error("{0}")]
    Forbidden(&'static str),
    /// Cross-origin state-changing request.
    #[error("CSRF check failed.")]
    OriginMismatch,
    /// Login attempts blocked for this credential/origin pair.
    #[error("Too many failed attempts. Try again later.")]
    RateLimited {
        blocked_until: Option<DateTime<Utc>>,
    },
    /// Referenced record does not exist.
    #[error("{0}")]
    NotFound(&'static str),
    /// Unique-key collision.
    #[error("{0}")]
    Conflict(String),
    /// Unexpected store or hashing failure.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            Self::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
            }
            Self::BadCredentials { remaining_attempts } => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Invalid credentials.",
                    "remainingAttempts": remaining_attempts,
                })),
            )
                .into_response(),
            Self::Forbidden(message) => {
                (StatusCode::FORBIDDEN, Json(json!({ "error": message }))).into_response()
            }
            Self::OriginMismatch => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "CSRF check failed." })),
            )
                .into_response(),
            Self::RateLimited { blocked_until } => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": "Too many failed attempts. Try again later.",
                    "blockedUntil": blocked_until
                        .map(|until| until.to_rfc3339_opts(SecondsFormat::Secs, true)),
                })),
            )
                .into_response(),
            Self::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            Self::Conflict(message) => {
                (StatusCode::CONFLICT, Json(json!({ "error": message }))).into_response()
            }
            Self::Internal(err) => {
                // Full detail stays server-side.
                error!("Internal auth error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error." })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AuthError;
    use axum::{http::StatusCode, response::IntoResponse};
    use chrono::{TimeZone, Utc};

    #[test]
    fn statuses_match_taxonomy() {
        let cases = [
            (
                AuthError::Validation("bad".to_string()).into_response(),
                StatusCode::BAD_REQUEST,
            ),
            (
                AuthError::Unauthorized("Unauthorized.").into_response(),
                StatusCode::UNAUTHORIZED,
            ),
            (
                AuthError::BadCredentials {
                    remaining_attempts: 4,
                }
                .into_response(),
                StatusCode::UNAUTHORIZED,
            ),
            (
                AuthError::Forbidden("Forbidden.").into_response(),
                StatusCode::FORBIDDEN,
            ),
            (
                AuthError::OriginMismatch.into_response(),
                StatusCode::FORBIDDEN,
            ),
            (
                AuthError::RateLimited {
                    blocked_until: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
                }
                .into_response(),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                AuthError::NotFound("Unknown user.").into_response(),
                StatusCode::NOT_FOUND,
            ),
            (
                AuthError::Conflict("duplicate".to_string()).into_response(),
                StatusCode::CONFLICT,
            ),
            (
                AuthError::Internal(anyhow::anyhow!("boom")).into_response(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (response, expected) in cases {
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn sqlx_failures_convert_via_anyhow() {
        let err: AuthError = anyhow::Error::from(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, AuthError::Internal(_)));
    }
}
