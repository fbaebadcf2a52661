//! Credential records and the lookup capability the verifier depends on.

use once_cell::sync::Lazy;
use regex::Regex;

/// Email of the built-in account.
pub const DEFAULT_IDENTIFIER: &str = "user@example.com";

/// bcrypt (cost 10) of the built-in account's password, `password123`.
pub const DEFAULT_SECRET_HASH: &str =
    "$2b$10$oz1SswthAyRnf2BKzIYsUuFNdwpieN7QOpts.PVu051k25KdurmZ2";

/// Stored (identifier, bcrypt hash) pair used for password verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialRecord {
    pub identifier: String,
    pub secret_hash: String,
}

impl CredentialRecord {
    #[must_use]
    pub fn new(identifier: impl Into<String>, secret_hash: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret_hash: secret_hash.into(),
        }
    }
}

/// Lookup of credential records by identifier.
///
/// Matching is exact and case-sensitive; implementations must not normalize.
pub trait CredentialStore: Send + Sync {
    fn find_by_identifier(&self, identifier: &str) -> Option<CredentialRecord>;
}

/// Immutable in-memory credential list, fixed at startup.
#[derive(Clone, Debug)]
pub struct StaticCredentials {
    records: Vec<CredentialRecord>,
}

impl StaticCredentials {
    #[must_use]
    pub fn new(records: Vec<CredentialRecord>) -> Self {
        Self { records }
    }

    #[must_use]
    pub fn single(identifier: impl Into<String>, secret_hash: impl Into<String>) -> Self {
        Self::new(vec![CredentialRecord::new(identifier, secret_hash)])
    }
}

impl Default for StaticCredentials {
    fn default() -> Self {
        Self::single(DEFAULT_IDENTIFIER, DEFAULT_SECRET_HASH)
    }
}

impl CredentialStore for StaticCredentials {
    fn find_by_identifier(&self, identifier: &str) -> Option<CredentialRecord> {
        self.records
            .iter()
            .find(|record| record.identifier == identifier)
            .cloned()
    }
}

static BCRYPT_HASH: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^\$2[abxy]\$\d{2}\$[./A-Za-z0-9]{53}$").ok());

/// Shape check for a modular-crypt bcrypt hash (`$2b$10$` + 53 chars).
pub fn valid_bcrypt_hash(hash: &str) -> bool {
    BCRYPT_HASH
        .as_ref()
        .is_some_and(|re| re.is_match(hash))
}
