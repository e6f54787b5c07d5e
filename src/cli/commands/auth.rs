use anyhow::{Context, Result};
use clap::{Arg, Command};

/// Parsed auth/session configuration arguments.
#[derive(Debug)]
pub struct Options {
    pub frontend_base_url: String,
    pub session_ttl_seconds: i64,
    pub bootstrap_secret: Option<String>,
}

impl Options {
    /// Extract auth options from parsed CLI matches.
    ///
    /// # Errors
    /// Returns an error if a defaulted argument is unexpectedly absent.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let frontend_base_url = matches
            .get_one::<String>("frontend-base-url")
            .cloned()
            .context("missing required argument: --frontend-base-url")?;
        let session_ttl_seconds = matches
            .get_one::<i64>("session-ttl-seconds")
            .copied()
            .context("missing required argument: --session-ttl-seconds")?;
        let bootstrap_secret = matches.get_one::<String>("bootstrap-secret").cloned();

        Ok(Self {
            frontend_base_url,
            session_ttl_seconds,
            bootstrap_secret,
        })
    }
}

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Public base URL of the frontend, used for CORS and cookie security")
                .env("ASSETGATE_FRONTEND_BASE_URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new("session-ttl-seconds")
                .long("session-ttl-seconds")
                .help("Session cookie TTL in seconds")
                .env("ASSETGATE_SESSION_TTL_SECONDS")
                .default_value("1209600")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("bootstrap-secret")
                .long("bootstrap-secret")
                .help("Shared secret for the out-of-band password bootstrap endpoint")
                .env("ASSETGATE_BOOTSTRAP_SECRET"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Command;

    fn matches(argv: Vec<&str>) -> clap::ArgMatches {
        with_args(Command::new("test")).get_matches_from(argv)
    }

    #[test]
    fn parse_defaults() {
        temp_env::with_vars(
            [
                ("ASSETGATE_FRONTEND_BASE_URL", None::<&str>),
                ("ASSETGATE_SESSION_TTL_SECONDS", None::<&str>),
                ("ASSETGATE_BOOTSTRAP_SECRET", None::<&str>),
            ],
            || {
                let options = Options::parse(&matches(vec!["test"])).expect("options");
                assert_eq!(options.frontend_base_url, "http://localhost:3000");
                assert_eq!(options.session_ttl_seconds, 1_209_600);
                assert!(options.bootstrap_secret.is_none());
            },
        );
    }

    #[test]
    fn parse_overrides() {
        let options = Options::parse(&matches(vec![
            "test",
            "--frontend-base-url",
            "https://assets.company.local",
            "--session-ttl-seconds",
            "3600",
            "--bootstrap-secret",
            "hunter2-but-longer",
        ]))
        .expect("options");
        assert_eq!(options.frontend_base_url, "https://assets.company.local");
        assert_eq!(options.session_ttl_seconds, 3600);
        assert_eq!(
            options.bootstrap_secret.as_deref(),
            Some("hunter2-but-longer")
        );
    }
}
