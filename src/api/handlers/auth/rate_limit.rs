//! Database-backed login rate limiting.
//!
//! Flow Overview:
//! 1) Track failed attempts per (email, client ip) digest in `login_rate_limits`.
//! 2) Count failures inside a 15-minute window anchored at the first failure.
//! 3) Five failures block the pair for a fixed 15 minutes; a retry against an
//!    active block neither increments the counter nor extends the block.
//!
//! Scaling: uses `PostgreSQL` to synchronize limits across service instances;
//! `register_failure` is a single upsert so concurrent failures cannot lose
//! updates.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};
use tracing::Instrument;

pub const MAX_ATTEMPTS: i64 = 5;
const WINDOW_SECONDS: i64 = 15 * 60;
const BLOCK_SECONDS: i64 = 15 * 60;

/// Limiter verdict for one credential/origin pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub blocked: bool,
    pub blocked_until: Option<DateTime<Utc>>,
    pub remaining_attempts: i64,
}

impl RateLimitStatus {
    const fn unlimited() -> Self {
        Self {
            blocked: false,
            blocked_until: None,
            remaining_attempts: MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginRateLimiter {
    pool: PgPool,
}

impl LoginRateLimiter {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Read the current limiter state without registering an attempt.
    ///
    /// # Errors
    /// Returns an error when the store is unreachable.
    pub async fn check(&self, key: &[u8]) -> Result<RateLimitStatus> {
        let query = "SELECT attempts, window_start, blocked_until FROM login_rate_limits WHERE key = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(key)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to read rate limit state")?;

        Ok(row.map_or_else(RateLimitStatus::unlimited, |row| {
            status_from_row(
                i64::from(row.get::<i32, _>("attempts")),
                row.get("window_start"),
                row.get("blocked_until"),
                Utc::now(),
            )
        }))
    }

    /// Record a failed attempt and return the resulting state.
    ///
    /// The whole decision runs as one upsert: an active block is returned
    /// untouched, an elapsed window restarts the counter at 1, and crossing
    /// the threshold stamps `blocked_until` relative to the triggering
    /// attempt. Concurrent callers serialize on the row.
    ///
    /// # Errors
    /// Returns an error when the store is unreachable.
    pub async fn register_failure(&self, key: &[u8]) -> Result<RateLimitStatus> {
        let query = r"
            INSERT INTO login_rate_limits AS lrl (key, attempts, window_start, blocked_until)
            VALUES ($1, 1, NOW(), NULL)
            ON CONFLICT (key) DO UPDATE SET
                attempts = CASE
                    WHEN lrl.blocked_until IS NOT NULL AND lrl.blocked_until > NOW()
                        THEN lrl.attempts
                    WHEN lrl.window_start <= NOW() - ($2 * INTERVAL '1 second')
                        THEN 1
                    ELSE lrl.attempts + 1
                END,
                window_start = CASE
                    WHEN lrl.blocked_until IS NOT NULL AND lrl.blocked_until > NOW()
                        THEN lrl.window_start
                    WHEN lrl.window_start <= NOW() - ($2 * INTERVAL '1 second')
                        THEN NOW()
                    ELSE lrl.window_start
                END,
                blocked_until = CASE
                    WHEN lrl.blocked_until IS NOT NULL AND lrl.blocked_until > NOW()
                        THEN lrl.blocked_until
                    WHEN (CASE
                            WHEN lrl.window_start <= NOW() - ($2 * INTERVAL '1 second') THEN 1
                            ELSE lrl.attempts + 1
                          END) >= $3
                        THEN NOW() + ($4 * INTERVAL '1 second')
                    ELSE NULL
                END
            RETURNING attempts, window_start, blocked_until
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(key)
            .bind(WINDOW_SECONDS)
            .bind(MAX_ATTEMPTS)
            .bind(BLOCK_SECONDS)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to register login failure")?;

        Ok(status_from_row(
            i64::from(row.get::<i32, _>("attempts")),
            row.get("window_start"),
            row.get("blocked_until"),
            Utc::now(),
        ))
    }

    /// Reset the pair's failure history; called on every successful login.
    ///
    /// Upserts so a missing row becomes a fresh zeroed record instead of an
    /// error.
    ///
    /// # Errors
    /// Returns an error when the store is unreachable.
    pub async fn clear(&self, key: &[u8]) -> Result<()> {
        let query = r"
            INSERT INTO login_rate_limits (key, attempts, window_start, blocked_until)
            VALUES ($1, 0, NOW(), NULL)
            ON CONFLICT (key) DO UPDATE
            SET attempts = 0, window_start = NOW(), blocked_until = NULL
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(key)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to clear rate limit state")?;
        Ok(())
    }
}

/// Map a stored row to a status at `now`.
///
/// A block that is still in the future wins outright; otherwise the counter
/// only matters while the window it was accumulated in has not elapsed.
fn status_from_row(
    attempts: i64,
    window_start: DateTime<Utc>,
    blocked_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> RateLimitStatus {
    if let Some(until) = blocked_until {
        if until > now {
            return RateLimitStatus {
                blocked: true,
                blocked_until: Some(until),
                remaining_attempts: 0,
            };
        }
    }

    let window_elapsed = now - window_start >= Duration::seconds(WINDOW_SECONDS);
    let remaining_attempts = if window_elapsed {
        MAX_ATTEMPTS
    } else {
        (MAX_ATTEMPTS - attempts).max(0)
    };

    RateLimitStatus {
        blocked: false,
        blocked_until: None,
        remaining_attempts,
    }
}
