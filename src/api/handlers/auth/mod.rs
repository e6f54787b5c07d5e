//! Auth handlers and supporting modules.
//!
//! This module is the identity and access core: credential hashing, session
//! issuance and revocation, login rate limiting, the same-origin guard, and
//! role checks. Everything else in the service consumes it through
//! [`principal::require_auth`] and [`principal::require_role`].
//!
//! ## Check ordering
//!
//! State-changing handlers run the same-origin guard first, the rate limiter
//! second (login only), and credential verification last. Reordering changes
//! the security properties; see the individual handler docs.
//!
//! ## Storage ownership
//!
//! Session and rate-limit rows belong to [`storage`] and [`rate_limit`]
//! respectively. Guards and handlers never touch those tables directly, and
//! no session or limiter state is cached in-process; every validation
//! re-reads the store, so any number of service instances can share it.

pub(crate) mod admin;
pub mod error;
pub mod hasher;
pub(crate) mod login;
pub mod origin;
pub(crate) mod password;
pub mod principal;
pub mod rate_limit;
pub(crate) mod session;
mod state;
pub mod storage;
pub mod types;
mod utils;

pub use error::AuthError;
pub use principal::{Principal, require_auth, require_role};
pub use rate_limit::{LoginRateLimiter, MAX_ATTEMPTS, RateLimitStatus};
pub use state::{AuthConfig, AuthState};
pub use storage::{SessionRecord, create_session, lookup_session, revoke_session};
pub use types::UserRole;
pub use utils::{ClientMeta, hash_session_token, normalize_email, rate_limit_key};
