//! Password digests: scrypt derivation with per-record cost parameters.
//!
//! Digests are encoded as `scrypt$N$r$p$<base64 salt>$<base64 key>` so the
//! cost parameters travel with every record. Raising the defaults later only
//! affects new digests; verification always re-derives with the stored
//! parameters, so old records keep working until the next password change.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::{RngCore, rngs::OsRng};
use scrypt::Params;
use subtle::ConstantTimeEq;

const SCHEME: &str = "scrypt";
// N = 32768; memory use is roughly 128 * N * r bytes (32 MiB here).
const SCRYPT_LOG_N: u8 = 15;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;
const SCRYPT_KEY_LEN: usize = 64;
const SALT_LEN: usize = 16;

/// Derive a fresh digest for `password` with the current cost parameters.
///
/// # Errors
/// Fails only when the system randomness source or the derivation itself is
/// unavailable; both are fatal conditions, not user errors.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .context("failed to generate password salt")?;

    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, SCRYPT_KEY_LEN)
        .context("invalid scrypt parameters")?;
    let mut derived = [0u8; SCRYPT_KEY_LEN];
    scrypt::scrypt(password.as_bytes(), &salt, &params, &mut derived)
        .context("scrypt derivation failed")?;

    Ok(format!(
        "{SCHEME}${}${SCRYPT_R}${SCRYPT_P}${}${}",
        1u64 << SCRYPT_LOG_N,
        STANDARD.encode(salt),
        STANDARD.encode(derived),
    ))
}

/// Verify `password` against a stored digest.
///
/// Fails closed: any unrecognized scheme, missing field, malformed number,
/// or undecodable payload is a plain `false`, never an error. The comparison
/// of the derived key is constant-time.
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected, params)) = parse_digest(stored) else {
        return false;
    };

    let mut derived = vec![0u8; expected.len()];
    if scrypt::scrypt(password.as_bytes(), &salt, &params, &mut derived).is_err() {
        return false;
    }

    if derived.len() != expected.len() {
        return false;
    }
    derived.ct_eq(&expected).into()
}

/// Parse an encoded digest, re-deriving params from the stored values.
fn parse_digest(stored: &str) -> Option<(Vec<u8>, Vec<u8>, Params)> {
    let mut fields = stored.split('$');
    if fields.next()? != SCHEME {
        return None;
    }

    let n: u64 = fields.next()?.parse().ok()?;
    let r: u32 = fields.next()?.parse().ok()?;
    let p: u32 = fields.next()?.parse().ok()?;
    let salt = STANDARD.decode(fields.next()?).ok()?;
    let expected = STANDARD.decode(fields.next()?).ok()?;
    if fields.next().is_some() {
        return None;
    }

    // N must be a power of two for the derivation to be defined.
    if n < 2 || !n.is_power_of_two() {
        return None;
    }
    let log_n = u8::try_from(n.trailing_zeros()).ok()?;

    Params::new(log_n, r, p, expected.len())
        .ok()
        .map(|params| (salt, expected, params))
}
