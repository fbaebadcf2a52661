use crate::{
    api,
    auth::{CredentialVerifier, StaticCredentials},
    cli::actions::server::{self, ServerArgs},
};
use anyhow::Result;
use std::sync::Arc;

#[derive(Debug)]
pub struct Args {
    pub server: ServerArgs,
    pub login_email: String,
    pub login_password_hash: String,
}

/// Execute the password login service.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let mut entries = args.server.entries();
    entries.push(("login_email", args.login_email.clone()));

    let store = StaticCredentials::single(args.login_email, args.login_password_hash);
    let verifier = Arc::new(CredentialVerifier::new(Arc::new(store)));
    let app = api::password_router(verifier, &args.server.static_dir);

    server::run(&args.server, api::Service::Password, &entries, app).await
}
