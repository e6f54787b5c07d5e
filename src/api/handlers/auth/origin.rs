//! Same-origin guard for state-changing endpoints.
//!
//! Runs before any authentication or rate-limit work so cross-origin
//! credentialed requests are rejected without consuming those resources.

use axum::http::{HeaderMap, header};

use super::error::AuthError;

/// Reject cross-origin state-changing requests.
///
/// Policy: a missing `Origin` header is allowed on purpose; same-origin
/// navigations and non-browser clients legitimately omit it. An `Origin`
/// without a `Host` cannot be validated and is rejected.
///
/// # Errors
/// `Validation` when the `Host` header is missing, `OriginMismatch` when the
/// origin does not match `{scheme}://{host}`.
pub fn ensure_same_origin(headers: &HeaderMap, scheme: &str) -> Result<(), AuthError> {
    let Some(origin) = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) else {
        return Ok(());
    };

    let Some(host) = headers.get(header::HOST).and_then(|v| v.to_str().ok()) else {
        return Err(AuthError::Validation("Invalid host.".to_string()));
    };

    let expected = format!("{scheme}://{host}");
    if origin != expected {
        return Err(AuthError::OriginMismatch);
    }

    Ok(())
}
