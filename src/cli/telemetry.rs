//! Tracing subscriber setup.
//!
//! Log output goes to stderr in either human-readable or JSON form
//! (`ASSETGATE_LOG_FORMAT=json`). Verbosity flags win over `RUST_LOG`;
//! without either, only errors are emitted.

use anyhow::{Context, Result};
use std::env::var;
use tracing::Level;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// # Errors
/// Returns an error if a global subscriber was already installed.
pub fn init(level: Option<Level>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::default().add_directive(level.into()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
    };

    let json = var("ASSETGATE_LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        Registry::default()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .context("Failed to initialize tracing subscriber")?;
    } else {
        Registry::default()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .context("Failed to initialize tracing subscriber")?;
    }

    Ok(())
}
