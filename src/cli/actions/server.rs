use crate::api::{self, handlers::auth};
use anyhow::Result;
use secrecy::SecretString;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub frontend_base_url: String,
    pub session_ttl_seconds: i64,
    pub bootstrap_secret: Option<String>,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if the database is unreachable or the listener fails to bind.
pub async fn execute(args: Args) -> Result<()> {
    let mut auth_config = auth::AuthConfig::new(args.frontend_base_url)
        .with_session_ttl_seconds(args.session_ttl_seconds);
    if let Some(secret) = args.bootstrap_secret {
        auth_config = auth_config.with_bootstrap_secret(SecretString::from(secret));
    }

    debug!("Server args: port={} dsn=***", args.port);

    api::new(args.port, args.dsn, auth_config).await
}
