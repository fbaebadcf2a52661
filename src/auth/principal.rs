//! Authenticated identity kept in the session.
//!
//! Only the fields the service uses are copied out of the provider response,
//! so the session shape does not follow provider schema changes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Google,
}

impl ProviderKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Principal {
    pub provider: ProviderKind,
    /// Stable subject id issued by the provider (Google `sub`).
    pub external_id: String,
    pub display_name: Option<String>,
}

impl Principal {
    /// Blank display names are dropped.
    #[must_use]
    pub fn new(provider: ProviderKind, external_id: String, display_name: Option<String>) -> Self {
        let display_name = display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        Self {
            provider,
            external_id,
            display_name,
        }
    }

    /// Name used in greetings, `"User"` when the provider sent none.
    #[must_use]
    pub fn greeting_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or("User")
    }
}
