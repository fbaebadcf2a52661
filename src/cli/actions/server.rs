//! Startup shared by both services: TLS material, banner, and the listener.

use crate::{api, tls};
use anyhow::{Context, Result};
use axum::Router;
use std::path::PathBuf;
use tracing::info;

/// Listener settings common to every service.
#[derive(Debug, Clone)]
pub struct ServerArgs {
    pub port: u16,
    pub tls: tls::TlsPaths,
    pub static_dir: PathBuf,
}

impl ServerArgs {
    /// Startup entries shared by every service, in banner order.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("listen", format!("[::]:{}", self.port)),
            ("tls_cert_path", self.tls.cert_path().display().to_string()),
            ("tls_key_path", self.tls.key_path().display().to_string()),
            ("static_dir", self.static_dir.display().to_string()),
        ]
    }
}

/// Load TLS material, log the banner, then serve `app` until shutdown.
///
/// TLS is loaded before binding so a broken certificate never leaves a
/// half-started listener behind.
///
/// # Errors
/// Returns an error if TLS material cannot be loaded or the server fails.
pub async fn run(
    args: &ServerArgs,
    service: api::Service,
    entries: &[(&str, String)],
    app: Router,
) -> Result<()> {
    let tls_config = tls::load_server_config(&args.tls)
        .context("TLS material is required to start the server")?;

    log_entries(service, entries);

    api::serve(args.port, tls_config, app).await
}

fn log_entries(service: api::Service, entries: &[(&str, String)]) {
    info!("{}", render_entries(service, entries));
}

fn render_entries(service: api::Service, entries: &[(&str, String)]) -> String {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{}\n\nService: {}\n\nStartup configuration:",
        banner(),
        service.as_str()
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    message
}

fn banner() -> String {
    let short_hash = short_commit(crate::GIT_COMMIT_HASH);
    BANNER.replace(
        "{VERSION}",
        &format!(" - {} - {}", env!("CARGO_PKG_VERSION"), short_hash),
    )
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}

const BANNER: &str = r"
   ___________
  |  _______  |
  | |       | |
  | |   o   | |   G A T E H O U S E {VERSION}
  | |       | |
 _|_|_______|_|_";
