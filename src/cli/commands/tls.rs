use crate::tls::TlsPaths;
use clap::{Arg, ArgMatches, Command};

pub const ARG_TLS_CERT_PATH: &str = "tls-cert-path";
pub const ARG_TLS_KEY_PATH: &str = "tls-key-path";

/// Parse TLS arguments from matches.
///
/// # Errors
/// Returns an error if a path is empty.
pub fn parse(matches: &ArgMatches) -> anyhow::Result<TlsPaths> {
    let read_required = |id: &str| -> anyhow::Result<String> {
        matches
            .get_one::<String>(id)
            .cloned()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
    };

    Ok(TlsPaths::new(
        read_required(ARG_TLS_CERT_PATH)?,
        read_required(ARG_TLS_KEY_PATH)?,
    ))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TLS_CERT_PATH)
                .long(ARG_TLS_CERT_PATH)
                .help("Path to TLS certificate chain (PEM)")
                .env("GATEHOUSE_TLS_CERT_PATH")
                .default_value("cert.pem")
                .global(true),
        )
        .arg(
            Arg::new(ARG_TLS_KEY_PATH)
                .long(ARG_TLS_KEY_PATH)
                .help("Path to TLS private key (PEM)")
                .env("GATEHOUSE_TLS_KEY_PATH")
                .default_value("key.pem")
                .global(true),
        )
}
