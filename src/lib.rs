//! # Assetgate (Identity & Access Core)
//!
//! `assetgate` is the identity and access subsystem of the internal IT asset
//! registry. It owns credential hashing, session issuance and revocation,
//! login rate limiting, and role-based authorization; the asset, employee,
//! and approval services consume its two capabilities ("authenticate this
//! request" and "authorize this role") over the shared database.
//!
//! ## Credentials
//!
//! Passwords are stored as scrypt digests with per-record cost parameters
//! (`scrypt$N$r$p$salt$hash`), so costs can be raised over time without
//! invalidating existing records. Verification is constant-time.
//!
//! ## Sessions
//!
//! Session tokens are 256-bit random values held only by the client; the
//! database stores a SHA-256 of the token. A session is active until it
//! expires (14 days) or is revoked by logout, password change, or an
//! administrative reset.
//!
//! ## Login protection
//!
//! Failed logins are counted per (email, client ip) digest inside a
//! 15-minute window anchored at the first failure; five failures block the
//! pair for 15 minutes. A successful login clears the counter. Unknown
//! emails and wrong passwords are indistinguishable to the caller.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
