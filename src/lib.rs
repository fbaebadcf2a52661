//! # Gatehouse (Google SSO and password login)
//!
//! `gatehouse` ships two independent authentication services from one crate.
//! Each runs as its own subcommand of the `gatehouse` binary and they never call
//! each other.
//!
//! ## Single Sign-On (`gatehouse sso`)
//!
//! Identity is delegated to Google through the authorization-code redirect
//! handshake. The service keeps a server-side session per browser, protected by
//! an `HttpOnly; Secure` cookie, and stores only a small [`auth::Principal`]
//! (provider, stable subject id, display name) once the callback succeeds.
//!
//! - **Guarded routes:** `/profile` checks for an authenticated principal in the
//!   session and silently redirects to `/` when there is none.
//! - **CSRF:** every redirect to Google carries a random `state` that must come
//!   back on the callback for the same session.
//!
//! ## Password Login (`gatehouse password`)
//!
//! `POST /login` checks an email and password against a single bcrypt record.
//! Unknown accounts and wrong passwords return byte-identical `401` responses
//! so the endpoint cannot be used to enumerate accounts.
//!
//! Both services refuse to start without readable TLS material.

pub mod api;
pub mod auth;
pub mod cli;
pub mod tls;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with("gatehouse/"));
        assert!(APP_USER_AGENT.ends_with(env!("CARGO_PKG_VERSION")));
    }
}
