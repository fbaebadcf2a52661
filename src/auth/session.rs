//! Cookie sessions for the single sign-on service.
//!
//! Flow Overview:
//! - The browser only ever holds a random token in the `gatehouse_session`
//!   cookie.
//! - The server stores session state under `HMAC-SHA256(session_secret, token)`,
//!   so a leaked session map cannot be replayed as cookies.
//! - Each request resolves the cookie into an explicit [`SessionContext`] that
//!   handlers receive and inspect; nothing is stashed in globals.
//!
//! Security boundaries: tokens are rotated when a login completes, sessions
//! expire after the configured TTL, and logout removes the server record.
//! Pending sign-ins are anonymous, so they get a short TTL of their own and a
//! hard cap; the oldest one is evicted once the cap is reached.

use anyhow::{Context, Result, anyhow};
use axum::{
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, InvalidHeaderValue},
    },
    response::Redirect,
};
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use std::{
    collections::{HashMap, VecDeque},
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::debug;

use super::{principal::Principal, provider::PendingLogin};

pub const SESSION_COOKIE_NAME: &str = "gatehouse_session";

const DEFAULT_SESSION_TTL_SECONDS: u64 = 12 * 60 * 60;
const DEFAULT_PENDING_TTL_SECONDS: u64 = 10 * 60;
const DEFAULT_PENDING_LIMIT: usize = 10_000;

type HmacSha256 = Hmac<Sha256>;

/// Where a session is in the sign-in handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Sent to the provider; waiting for the callback.
    PendingCallback(PendingLogin),
    Authenticated(Principal),
}

#[derive(Clone, Debug)]
struct SessionRecord {
    state: SessionState,
    created_at: Instant,
}

#[derive(Default)]
struct Sessions {
    records: HashMap<Vec<u8>, SessionRecord>,
    /// Pending sign-ins in creation order, oldest first. Entries whose record
    /// was consumed or replaced are skipped when popped.
    pending: VecDeque<(Instant, Vec<u8>)>,
}

impl Sessions {
    /// Drop pending sign-ins older than `ttl` and the oldest ones beyond `keep`.
    fn evict_pending(&mut self, ttl: Duration, keep: usize) -> usize {
        let mut evicted = 0;
        while let Some(&(created_at, _)) = self.pending.front() {
            if created_at.elapsed() < ttl && self.pending.len() <= keep {
                break;
            }
            let Some((created_at, key)) = self.pending.pop_front() else {
                break;
            };
            let still_pending = self.records.get(&key).is_some_and(|record| {
                record.created_at == created_at
                    && matches!(record.state, SessionState::PendingCallback(_))
            });
            if still_pending {
                self.records.remove(&key);
                evicted += 1;
            }
        }
        evicted
    }
}

/// Per-request view of the caller's session.
#[derive(Clone, Debug, Default)]
pub struct SessionContext {
    key: Option<Vec<u8>>,
    state: Option<SessionState>,
}

impl SessionContext {
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        match &self.state {
            Some(SessionState::Authenticated(principal)) => Some(principal),
            _ => None,
        }
    }

    #[must_use]
    pub fn state(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    /// True when the request carried a cookie that maps to a live session.
    #[must_use]
    pub const fn has_session(&self) -> bool {
        self.key.is_some()
    }
}

/// Whether the request carries an authenticated principal.
#[must_use]
pub fn is_authenticated(context: &SessionContext) -> bool {
    context.principal().is_some()
}

/// Gate for guarded routes: the principal, or a redirect to the entry page.
///
/// # Errors
/// Returns a redirect to `/` when the session has no authenticated principal.
pub fn require_principal(context: &SessionContext) -> Result<&Principal, Redirect> {
    context.principal().ok_or_else(|| Redirect::to("/"))
}

/// In-memory session map keyed by the MAC of the cookie token.
pub struct SessionStore {
    mac: HmacSha256,
    ttl: Duration,
    pending_ttl: Duration,
    pending_limit: usize,
    sessions: RwLock<Sessions>,
}

impl SessionStore {
    /// Build a store keyed with the configured session secret.
    ///
    /// # Errors
    /// Returns an error if the secret cannot key the MAC.
    pub fn new(secret: &SecretString) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
            .map_err(|_| anyhow!("invalid session secret"))?;
        Ok(Self {
            mac,
            ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECONDS),
            pending_ttl: Duration::from_secs(DEFAULT_PENDING_TTL_SECONDS),
            pending_limit: DEFAULT_PENDING_LIMIT,
            sessions: RwLock::new(Sessions::default()),
        })
    }

    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Lifetime of a sign-in that has been started but not completed.
    #[must_use]
    pub const fn with_pending_ttl(mut self, pending_ttl: Duration) -> Self {
        self.pending_ttl = pending_ttl;
        self
    }

    /// Upper bound on concurrently pending sign-ins (at least one).
    #[must_use]
    pub fn with_pending_limit(mut self, pending_limit: usize) -> Self {
        self.pending_limit = pending_limit.max(1);
        self
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub const fn pending_ttl(&self) -> Duration {
        self.pending_ttl
    }

    const fn lifetime(&self, state: &SessionState) -> Duration {
        match state {
            SessionState::PendingCallback(_) => self.pending_ttl,
            SessionState::Authenticated(_) => self.ttl,
        }
    }

    /// Resolve the request cookie into a session context.
    ///
    /// Missing, unknown, and expired cookies all yield an empty context.
    pub async fn context(&self, headers: &HeaderMap) -> SessionContext {
        let Some(token) = extract_session_token(headers) else {
            return SessionContext::default();
        };
        let key = self.session_key(&token);
        let sessions = self.sessions.read().await;
        match sessions.records.get(&key) {
            Some(record) if record.created_at.elapsed() < self.lifetime(&record.state) => {
                SessionContext {
                    key: Some(key),
                    state: Some(record.state.clone()),
                }
            }
            Some(_) => {
                debug!("session expired");
                SessionContext::default()
            }
            None => SessionContext::default(),
        }
    }

    /// Start a provider sign-in: replace any current session with a fresh one
    /// waiting for the callback that must present `pending`.
    ///
    /// Returns the new cookie token.
    ///
    /// # Errors
    /// Returns an error if the system RNG fails.
    pub async fn begin_login(
        &self,
        context: &SessionContext,
        pending: PendingLogin,
    ) -> Result<String> {
        let token = generate_token().context("failed to generate session token")?;
        let key = self.session_key(&token);
        let created_at = Instant::now();

        let mut sessions = self.sessions.write().await;
        if let Some(old) = &context.key {
            sessions.records.remove(old);
        }
        let evicted = sessions.evict_pending(self.pending_ttl, self.pending_limit - 1);
        if evicted > 0 {
            debug!(evicted, "pending sign-ins evicted");
        }
        sessions.records.insert(
            key.clone(),
            SessionRecord {
                state: SessionState::PendingCallback(pending),
                created_at,
            },
        );
        sessions.pending.push_back((created_at, key));
        Ok(token)
    }

    /// Consume the pending sign-in of this session. Only a pending record is
    /// removed, so a callback can be processed once and a stray callback on an
    /// authenticated session leaves it intact.
    pub async fn take_pending(&self, context: &SessionContext) -> Option<PendingLogin> {
        let key = context.key.as_ref()?;
        let mut sessions = self.sessions.write().await;
        let is_pending = sessions
            .records
            .get(key)
            .is_some_and(|record| matches!(record.state, SessionState::PendingCallback(_)));
        if !is_pending {
            return None;
        }
        match sessions.records.remove(key)?.state {
            SessionState::PendingCallback(pending) => Some(pending),
            SessionState::Authenticated(_) => None,
        }
    }

    /// Store an authenticated principal under a brand-new token.
    ///
    /// # Errors
    /// Returns an error if the system RNG fails.
    pub async fn establish(&self, context: &SessionContext, principal: Principal) -> Result<String> {
        let token = generate_token().context("failed to generate session token")?;
        let key = self.session_key(&token);

        let mut sessions = self.sessions.write().await;
        if let Some(old) = &context.key {
            sessions.records.remove(old);
        }
        sessions.records.insert(
            key,
            SessionRecord {
                state: SessionState::Authenticated(principal),
                created_at: Instant::now(),
            },
        );
        Ok(token)
    }

    /// Remove the session record, if any.
    pub async fn destroy(&self, context: &SessionContext) {
        if let Some(key) = &context.key {
            self.sessions.write().await.records.remove(key);
        }
    }

    /// Drop every expired record. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.records.len();
        sessions
            .records
            .retain(|_, record| record.created_at.elapsed() < self.lifetime(&record.state));
        sessions.evict_pending(self.pending_ttl, self.pending_limit);
        before - sessions.records.len()
    }

    /// Number of records held, expired ones included until purged.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn session_key(&self, token: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("mac", &"***")
            .field("ttl", &self.ttl)
            .field("pending_ttl", &self.pending_ttl)
            .field("pending_limit", &self.pending_limit)
            .finish_non_exhaustive()
    }
}

/// Build a secure `HttpOnly` cookie for the session token.
///
/// # Errors
/// Returns an error if the token contains characters invalid in a header.
pub fn session_cookie(token: &str, ttl: Duration) -> Result<HeaderValue, InvalidHeaderValue> {
    let max_age = ttl.as_secs();
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age={max_age}"
    ))
}

/// Cookie that tells the browser to drop the session token.
#[must_use]
pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("gatehouse_session=; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age=0")
}

/// Create a new random token (32 bytes, base64url without padding).
fn generate_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to read from the system RNG")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == SESSION_COOKIE_NAME && !val.trim().is_empty())
                .then(|| val.trim().to_string())
        })
}
