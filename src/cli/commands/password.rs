use crate::auth::credentials::{DEFAULT_IDENTIFIER, DEFAULT_SECRET_HASH, valid_bcrypt_hash};
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command, builder::ValueParser};

pub const COMMAND: &str = "password";

pub const ARG_LOGIN_EMAIL: &str = "login-email";
pub const ARG_LOGIN_PASSWORD_HASH: &str = "login-password-hash";

#[derive(Debug)]
pub struct Options {
    pub login_email: String,
    pub login_password_hash: String,
}

impl Options {
    /// Parse password login arguments from the `password` subcommand matches.
    ///
    /// # Errors
    /// Returns an error if an argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let read = |id: &str| -> Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .with_context(|| format!("missing required argument: --{id}"))
        };

        Ok(Self {
            login_email: read(ARG_LOGIN_EMAIL)?,
            login_password_hash: read(ARG_LOGIN_PASSWORD_HASH)?,
        })
    }
}

#[must_use]
pub fn validator_bcrypt_hash() -> ValueParser {
    ValueParser::from(move |hash: &str| -> std::result::Result<String, String> {
        if valid_bcrypt_hash(hash) {
            Ok(hash.to_string())
        } else {
            Err("expected a bcrypt hash like $2b$10$...".to_string())
        }
    })
}

#[must_use]
pub fn command() -> Command {
    Command::new(COMMAND)
        .about("Password login against a single bcrypt credential")
        .arg(
            Arg::new(ARG_LOGIN_EMAIL)
                .long(ARG_LOGIN_EMAIL)
                .help("Email of the account allowed to log in")
                .env("GATEHOUSE_LOGIN_EMAIL")
                .default_value(DEFAULT_IDENTIFIER),
        )
        .arg(
            Arg::new(ARG_LOGIN_PASSWORD_HASH)
                .long(ARG_LOGIN_PASSWORD_HASH)
                .help("bcrypt hash of the account password")
                .env("GATEHOUSE_LOGIN_PASSWORD_HASH")
                .default_value(DEFAULT_SECRET_HASH)
                .value_parser(validator_bcrypt_hash()),
        )
}
