use crate::{
    api::{self, SsoState},
    auth::{GoogleConfig, GoogleProvider, SessionStore},
    cli::actions::server::{self, ServerArgs},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tokio::time::interval;
use tracing::debug;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct Args {
    pub server: ServerArgs,
    pub session_secret: SecretString,
    pub google_client_id: String,
    pub google_client_secret: SecretString,
    pub public_url: String,
    pub session_ttl_seconds: u64,
}

/// Execute the single sign-on service.
/// # Errors
/// Returns an error if the provider configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = GoogleConfig::new(
        args.google_client_id.clone(),
        args.google_client_secret,
        &args.public_url,
    )?;

    let mut entries = args.server.entries();
    entries.extend([
        ("public_url", args.public_url.clone()),
        ("redirect_uri", config.redirect_uri().to_string()),
        ("google_client_id", args.google_client_id),
        ("session_ttl_seconds", args.session_ttl_seconds.to_string()),
    ]);

    let sessions = SessionStore::new(&args.session_secret)
        .context("Failed to initialize session store")?
        .with_ttl(Duration::from_secs(args.session_ttl_seconds));
    let provider = GoogleProvider::new(config)?;
    debug!("Identity provider: {:?}", provider);

    let state = Arc::new(SsoState::new(sessions, Arc::new(provider)));
    spawn_session_purge(state.clone(), SESSION_PURGE_INTERVAL);
    let app = api::sso_router(state, &args.server.static_dir);

    server::run(&args.server, api::Service::Sso, &entries, app).await
}

/// Drop expired sessions in the background so idle records do not pile up.
fn spawn_session_purge(state: Arc<SsoState>, period: Duration) {
    tokio::spawn(async move {
        let mut interval = interval(period);
        loop {
            interval.tick().await;
            let purged = state.sessions().purge_expired().await;
            if purged > 0 {
                debug!(purged, "expired sessions purged");
            }
        }
    });
}
