use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const COMMAND: &str = "sso";

pub const ARG_SESSION_SECRET: &str = "session-secret";
pub const ARG_GOOGLE_CLIENT_ID: &str = "google-client-id";
pub const ARG_GOOGLE_CLIENT_SECRET: &str = "google-client-secret";
pub const ARG_PUBLIC_URL: &str = "public-url";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";

#[derive(Debug)]
pub struct Options {
    pub session_secret: SecretString,
    pub google_client_id: String,
    pub google_client_secret: SecretString,
    pub public_url: String,
    pub session_ttl_seconds: u64,
}

impl Options {
    /// Parse single sign-on arguments from the `sso` subcommand matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing or blank.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let read_required = |id: &str| -> Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("missing required argument: --{id}"))
        };

        Ok(Self {
            session_secret: SecretString::from(read_required(ARG_SESSION_SECRET)?),
            google_client_id: read_required(ARG_GOOGLE_CLIENT_ID)?,
            google_client_secret: SecretString::from(read_required(ARG_GOOGLE_CLIENT_SECRET)?),
            public_url: read_required(ARG_PUBLIC_URL)?,
            session_ttl_seconds: matches
                .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(43_200),
        })
    }
}

#[must_use]
pub fn command() -> Command {
    Command::new(COMMAND)
        .about("Google single sign-on with a guarded profile page")
        .arg(
            Arg::new(ARG_SESSION_SECRET)
                .long(ARG_SESSION_SECRET)
                .help("Secret used to key session identifiers")
                .env("SESSION_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_ID)
                .long(ARG_GOOGLE_CLIENT_ID)
                .help("OAuth client id issued by Google")
                .env("GOOGLE_CLIENT_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_SECRET)
                .long(ARG_GOOGLE_CLIENT_SECRET)
                .help("OAuth client secret issued by Google")
                .env("GOOGLE_CLIENT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_PUBLIC_URL)
                .long(ARG_PUBLIC_URL)
                .help("Externally visible base URL, used to build the OAuth callback URL")
                .env("GATEHOUSE_PUBLIC_URL")
                .default_value("https://localhost:3000"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session lifetime in seconds")
                .env("GATEHOUSE_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
