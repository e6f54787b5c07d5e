//! Auth configuration and shared state.

use secrecy::SecretString;

// 14 days.
const DEFAULT_SESSION_TTL_SECONDS: i64 = 14 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    session_ttl_seconds: i64,
    bootstrap_secret: Option<SecretString>,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            bootstrap_secret: None,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_bootstrap_secret(mut self, secret: SecretString) -> Self {
        self.bootstrap_secret = Some(secret);
        self
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub(crate) fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    pub(super) fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }

    /// Scheme the service is reached through; TLS terminates at the proxy,
    /// so the origin check reconstructs it from configuration.
    pub(super) fn public_scheme(&self) -> &'static str {
        if self.session_cookie_secure() {
            "https"
        } else {
            "http"
        }
    }

    pub(super) fn bootstrap_secret(&self) -> Option<&SecretString> {
        self.bootstrap_secret.as_ref()
    }
}

pub struct AuthState {
    config: AuthConfig,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new("https://assets.company.local".to_string());

        assert_eq!(config.frontend_base_url(), "https://assets.company.local");
        assert_eq!(
            config.session_ttl_seconds(),
            super::DEFAULT_SESSION_TTL_SECONDS
        );
        assert!(config.session_cookie_secure());
        assert_eq!(config.public_scheme(), "https");
        assert!(config.bootstrap_secret().is_none());

        let config = config
            .with_session_ttl_seconds(3600)
            .with_bootstrap_secret(SecretString::from("setup-secret".to_string()));

        assert_eq!(config.session_ttl_seconds(), 3600);
        assert_eq!(
            config.bootstrap_secret().map(ExposeSecret::expose_secret),
            Some("setup-secret")
        );
    }

    #[test]
    fn http_frontend_disables_secure_cookie() {
        let config = AuthConfig::new("http://localhost:3000".to_string());
        assert!(!config.session_cookie_secure());
        assert_eq!(config.public_scheme(), "http");
    }

    #[test]
    fn auth_state_exposes_config() {
        let state = AuthState::new(AuthConfig::new("http://localhost:3000".to_string()));
        assert_eq!(state.config().frontend_base_url(), "http://localhost:3000");
    }
}
