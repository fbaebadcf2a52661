//! Password verification against the credential store.
//!
//! Flow Overview: look the identifier up, then let bcrypt compare the submitted
//! password with the stored hash on the blocking pool. Unknown identifiers and
//! wrong passwords collapse into the same [`VerifyError::AuthenticationFailed`]
//! so callers cannot tell them apart.

use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::{self, JoinError};
use tracing::{debug, instrument};

use super::credentials::CredentialStore;

/// Hash compared against when the identifier is unknown, so both failure paths
/// cost one bcrypt round.
const DUMMY_SECRET_HASH: &str = "$2b$10$YPHbHyFDCkCb/Qowm.3aGOxf2I5cb4Xjpemu3lX/fmF5ottUhGH2K";

#[derive(Debug, Error)]
pub enum VerifyError {
    /// Unknown identifier or wrong password.
    #[error("invalid email or password")]
    AuthenticationFailed,
    /// The stored hash could not be checked (e.g. it is malformed).
    #[error("password hash verification failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("password verification task failed: {0}")]
    Task(#[from] JoinError),
}

impl VerifyError {
    /// Internal failures are logged and reported as a generic `500`.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        !matches!(self, Self::AuthenticationFailed)
    }
}

#[derive(Clone)]
pub struct CredentialVerifier {
    store: Arc<dyn CredentialStore>,
}

impl CredentialVerifier {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Check `secret` against the record stored for `identifier`.
    ///
    /// The secret is moved into the hashing task and dropped (zeroized) when it
    /// finishes.
    ///
    /// # Errors
    /// [`VerifyError::AuthenticationFailed`] when the identifier is unknown or
    /// the password does not match; `Hash`/`Task` when verification itself
    /// could not run.
    #[instrument(skip_all)]
    pub async fn verify(&self, identifier: &str, secret: SecretString) -> Result<(), VerifyError> {
        let record = self.store.find_by_identifier(identifier);
        let known = record.is_some();
        let hash = record.map_or_else(
            || DUMMY_SECRET_HASH.to_string(),
            |record| record.secret_hash,
        );

        let matched =
            task::spawn_blocking(move || bcrypt::verify(secret.expose_secret(), &hash)).await??;

        if known && matched {
            Ok(())
        } else {
            debug!(known, "credential verification failed");
            Err(VerifyError::AuthenticationFailed)
        }
    }
}

impl std::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVerifier").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::{DEFAULT_IDENTIFIER, StaticCredentials};

    fn verifier() -> CredentialVerifier {
        CredentialVerifier::new(Arc::new(StaticCredentials::default()))
    }

    #[tokio::test]
    async fn correct_password_succeeds() {
        let result = verifier()
            .verify(DEFAULT_IDENTIFIER, SecretString::from("password123".to_string()))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn wrong_password_fails() {
        let result = verifier()
            .verify(DEFAULT_IDENTIFIER, SecretString::from("wrong".to_string()))
            .await;
        assert!(matches!(result, Err(VerifyError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn empty_password_fails() {
        let result = verifier()
            .verify(DEFAULT_IDENTIFIER, SecretString::from(String::new()))
            .await;
        assert!(matches!(result, Err(VerifyError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn unknown_identifier_fails_like_wrong_password() {
        let result = verifier()
            .verify("nobody@example.com", SecretString::from("password123".to_string()))
            .await;
        assert!(matches!(result, Err(VerifyError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn identifier_is_case_sensitive() {
        let result = verifier()
            .verify("USER@example.com", SecretString::from("password123".to_string()))
            .await;
        assert!(matches!(result, Err(VerifyError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn malformed_hash_is_internal() {
        let store = StaticCredentials::single(DEFAULT_IDENTIFIER, "not-a-bcrypt-hash");
        let verifier = CredentialVerifier::new(Arc::new(store));
        let result = verifier
            .verify(DEFAULT_IDENTIFIER, SecretString::from("password123".to_string()))
            .await;
        assert!(matches!(result, Err(VerifyError::Hash(_))));
        assert!(result.is_err_and(|err| err.is_internal()));
    }

    #[test]
    fn authentication_failed_is_not_internal() {
        assert!(!VerifyError::AuthenticationFailed.is_internal());
    }
}
