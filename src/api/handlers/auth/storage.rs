//! Database helpers for credential and session state.
//!
//! Sessions are owned exclusively by this module; guards and handlers only
//! see `SessionRecord`s, never rows. Every mutation is a single statement so
//! concurrent requests against the same record cannot lose updates.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::{Instrument, warn};
use uuid::Uuid;

use super::types::UserRole;
use super::utils::{ClientMeta, generate_session_token, hash_session_token, is_unique_violation};

// Sessions older than this since their last touch get a fresh last_seen_at;
// bounds write amplification on busy sessions while keeping idle-session
// auditing usable.
const SESSION_TOUCH_SECONDS: i64 = 5 * 60;

/// Credential row needed to attempt a login.
pub(super) struct UserRecord {
    pub(super) user_id: Uuid,
    pub(super) name: String,
    pub(super) email: String,
    pub(super) role: UserRole,
    pub(super) password_hash: Option<String>,
}

/// Minimal data resolved for a valid session token.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

/// User row returned by provisioning and administrative updates.
pub(super) struct AdminUserRecord {
    pub(super) user_id: Uuid,
    pub(super) name: String,
    pub(super) email: String,
    pub(super) role: UserRole,
    pub(super) password_updated_at: Option<DateTime<Utc>>,
    pub(super) created_at: DateTime<Utc>,
}

/// Outcome when provisioning a user (email is unique, case-insensitively).
pub(super) enum CreateUserOutcome {
    Created(AdminUserRecord),
    Conflict,
}

/// Look up login data by normalized email.
pub(super) async fn lookup_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRecord>> {
    let query =
        "SELECT id, name, email, role, password_hash FROM users WHERE LOWER(email) = $1 LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    Ok(row.map(|row| UserRecord {
        user_id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        role: row.get("role"),
        password_hash: row.get("password_hash"),
    }))
}

/// Create a session for `user_id` and return the raw token plus its expiry.
///
/// Generates a random token, stores only its hash, and retries a couple of
/// times on the (vanishingly unlikely) token-hash collision.
pub async fn create_session(
    pool: &PgPool,
    user_id: Uuid,
    ttl_seconds: i64,
    client: &ClientMeta,
) -> Result<(String, DateTime<Utc>)> {
    let query = r"
        INSERT INTO user_sessions (token_hash, user_id, expires_at, ip_address, user_agent)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'), $4, $5)
        RETURNING expires_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );

    for _ in 0..3 {
        let token = generate_session_token()?;
        let token_hash = hash_session_token(&token);
        let result = sqlx::query(query)
            .bind(token_hash)
            .bind(user_id)
            .bind(ttl_seconds)
            .bind(client.ip_address.as_deref())
            .bind(client.user_agent.as_deref())
            .fetch_one(pool)
            .instrument(span.clone())
            .await;

        match result {
            Ok(row) => return Ok((token, row.get("expires_at"))),
            Err(err) if is_unique_violation(&err) => {}
            Err(err) => return Err(err).context("failed to insert session"),
        }
    }

    Err(anyhow!("failed to generate unique session token"))
}

/// Resolve a token hash to an active session.
///
/// Absent, revoked, and expired rows all come back as `None`; the caller
/// cannot tell which. A hit refreshes `last_seen_at` when stale, as a
/// best-effort side write that never fails the lookup.
pub async fn lookup_session(pool: &PgPool, token_hash: &[u8]) -> Result<Option<SessionRecord>> {
    let query = r"
        SELECT users.id, users.name, users.email, users.role
        FROM user_sessions
        JOIN users ON users.id = user_sessions.user_id
        WHERE user_sessions.token_hash = $1
          AND user_sessions.revoked_at IS NULL
          AND user_sessions.expires_at > NOW()
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup session")?;

    let Some(row) = row else {
        return Ok(None);
    };

    // Record activity for auditing without extending the session TTL. The
    // predicate keeps the write away from recently-touched rows.
    let query = r"
        UPDATE user_sessions
        SET last_seen_at = NOW()
        WHERE token_hash = $1
          AND last_seen_at < NOW() - ($2 * INTERVAL '1 second')
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    if let Err(err) = sqlx::query(query)
        .bind(token_hash)
        .bind(SESSION_TOUCH_SECONDS)
        .execute(pool)
        .instrument(span)
        .await
    {
        warn!("Failed to touch session last_seen_at: {err}");
    }

    Ok(Some(SessionRecord {
        user_id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        role: row.get("role"),
    }))
}

/// Revoke the session for `token_hash`, if it exists and is still active.
///
/// Idempotent by construction; callers learn nothing about whether a row
/// matched.
pub async fn revoke_session(pool: &PgPool, token_hash: &[u8]) -> Result<()> {
    let query = r"
        UPDATE user_sessions
        SET revoked_at = NOW()
        WHERE token_hash = $1
          AND revoked_at IS NULL
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to revoke session")?;
    Ok(())
}

/// Revoke every active session owned by `user_id`.
///
/// Runs on the caller's transaction so password changes and administrative
/// resets revoke atomically with the credential update.
pub(super) async fn revoke_user_sessions(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
) -> Result<u64> {
    let query = r"
        UPDATE user_sessions
        SET revoked_at = NOW()
        WHERE user_id = $1
          AND revoked_at IS NULL
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to revoke user sessions")?;
    Ok(result.rows_affected())
}

/// Fetch the stored digest for an authenticated user's re-verification.
///
/// Collapses "no such user" and "no digest set" into `None`; both mean the
/// password change cannot proceed.
pub(super) async fn fetch_password_hash(pool: &PgPool, user_id: Uuid) -> Result<Option<String>> {
    let query = "SELECT password_hash FROM users WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch password hash")?;

    Ok(row.and_then(|row| row.get("password_hash")))
}

/// Replace a user's digest inside the caller's transaction.
pub(super) async fn update_password(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    password_hash: &str,
) -> Result<()> {
    let query = r"
        UPDATE users
        SET password_hash = $2,
            password_updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(password_hash)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to update password hash")?;
    Ok(())
}

/// Set a user's digest by email for the bootstrap endpoint.
pub(super) async fn set_password_by_email(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
) -> Result<Option<UserRecord>> {
    let query = r"
        UPDATE users
        SET password_hash = $2,
            password_updated_at = NOW()
        WHERE LOWER(email) = $1
        RETURNING id, name, email, role
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(password_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to set password by email")?;

    Ok(row.map(|row| UserRecord {
        user_id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        role: row.get("role"),
        password_hash: Some(password_hash.to_string()),
    }))
}

/// Provision a user with a pre-hashed credential.
pub(super) async fn insert_user(
    pool: &PgPool,
    name: &str,
    email: &str,
    role: UserRole,
    password_hash: &str,
) -> Result<CreateUserOutcome> {
    let query = r"
        INSERT INTO users (name, email, role, password_hash, password_updated_at)
        VALUES ($1, $2, $3, $4, NOW())
        RETURNING id, name, email, role, password_updated_at, created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(name)
        .bind(email)
        .bind(role)
        .bind(password_hash)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(CreateUserOutcome::Created(AdminUserRecord {
            user_id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            role: row.get("role"),
            password_updated_at: row.get("password_updated_at"),
            created_at: row.get("created_at"),
        })),
        Err(err) if is_unique_violation(&err) => Ok(CreateUserOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

/// Apply an administrative update; absent fields keep their current values.
///
/// A password reset stamps `password_updated_at`; the caller revokes the
/// target's sessions on the same transaction.
pub(super) async fn admin_update_user(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    name: Option<&str>,
    role: Option<UserRole>,
    password_hash: Option<&str>,
) -> Result<Option<AdminUserRecord>> {
    let query = r"
        UPDATE users
        SET name = COALESCE($2, name),
            role = COALESCE($3, role),
            password_hash = COALESCE($4, password_hash),
            password_updated_at = CASE
                WHEN $4 IS NOT NULL THEN NOW()
                ELSE password_updated_at
            END
        WHERE id = $1
        RETURNING id, name, email, role, password_updated_at, created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(name)
        .bind(role)
        .bind(password_hash)
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to update user")?;

    Ok(row.map(|row| AdminUserRecord {
        user_id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        role: row.get("role"),
        password_updated_at: row.get("password_updated_at"),
        created_at: row.get("created_at"),
    }))
}

#[cfg(test)]
mod tests {
    use super::{SessionRecord, UserRecord};
    use crate::api::handlers::auth::types::UserRole;
    use uuid::Uuid;

    #[test]
    fn session_record_holds_values() {
        let record = SessionRecord {
            user_id: Uuid::nil(),
            name: "IT Admin".to_string(),
            email: "it.admin@company.local".to_string(),
            role: UserRole::ItAdmin,
        };
        assert_eq!(record.user_id, Uuid::nil());
        assert_eq!(record.role, UserRole::ItAdmin);
    }

    #[test]
    fn user_record_may_lack_digest() {
        let record = UserRecord {
            user_id: Uuid::nil(),
            name: "Auditor".to_string(),
            email: "auditor@company.local".to_string(),
            role: UserRole::Auditor,
            password_hash: None,
        };
        assert!(record.password_hash.is_none());
    }
}
