//! Authentication building blocks shared by the HTTP handlers.
//!
//! - [`credentials`] and [`verifier`] implement the password check used by
//!   `POST /login`.
//! - [`provider`], [`principal`] and [`session`] implement the Google redirect
//!   flow and the cookie session that remembers who signed in.

pub mod credentials;
pub mod principal;
pub mod provider;
pub mod session;
pub mod verifier;

pub use credentials::{CredentialRecord, CredentialStore, StaticCredentials};
pub use principal::{Principal, ProviderKind};
pub use provider::{
    AuthorizationRequest, GoogleConfig, GoogleProvider, IdentityProvider, PendingLogin,
    ProviderError,
};
pub use session::{SessionContext, SessionState, SessionStore, is_authenticated, require_principal};
pub use verifier::{CredentialVerifier, VerifyError};
