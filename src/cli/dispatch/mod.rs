//! Map validated CLI matches to the action of the selected service.

use crate::cli::actions::{Action, password, server::ServerArgs, sso};
use crate::cli::commands::{self, tls};
use anyhow::{Result, anyhow};
use clap::ArgMatches;
use std::path::PathBuf;

/// Map validated CLI matches to a service action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((commands::sso::COMMAND, sub)) => {
            let options = commands::sso::Options::parse(sub)?;
            Ok(Action::Sso(sso::Args {
                server: server_args(sub)?,
                session_secret: options.session_secret,
                google_client_id: options.google_client_id,
                google_client_secret: options.google_client_secret,
                public_url: options.public_url,
                session_ttl_seconds: options.session_ttl_seconds,
            }))
        }
        Some((commands::password::COMMAND, sub)) => {
            let options = commands::password::Options::parse(sub)?;
            Ok(Action::Password(password::Args {
                server: server_args(sub)?,
                login_email: options.login_email,
                login_password_hash: options.login_password_hash,
            }))
        }
        Some((name, _)) => Err(anyhow!("unknown command: {name}")),
        None => Err(anyhow!("missing command: expected sso or password")),
    }
}

// Global arguments are propagated into the subcommand matches.
fn server_args(matches: &ArgMatches) -> Result<ServerArgs> {
    let port = matches
        .get_one::<u16>(commands::ARG_PORT)
        .copied()
        .unwrap_or(3000);
    let static_dir = matches
        .get_one::<String>(commands::ARG_STATIC_DIR)
        .map_or_else(|| PathBuf::from("static"), PathBuf::from);

    Ok(ServerArgs {
        port,
        tls: tls::parse(matches)?,
        static_dir,
    })
}
