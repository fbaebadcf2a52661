//! Google sign-in, the guarded profile page, and logout.
//!
//! Flow Overview:
//! 1) `GET /auth/google` opens a pending session (CSRF state + PKCE verifier)
//!    and redirects to Google.
//! 2) `GET /auth/google/callback` checks `state`, exchanges the `code` with the
//!    stored verifier, and stores the principal under a rotated session token.
//! 3) `GET /profile` greets the principal; `GET /logout` drops the session.
//!
//! Every failure on the callback ends on `/`. A pending session is dropped; an
//! authenticated one is left alone.

use crate::auth::{
    AuthorizationRequest, IdentityProvider, Principal, ProviderError, SessionContext, SessionStore,
    is_authenticated, require_principal,
    session::{clear_session_cookie, session_cookie},
};
use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::IntoParams;

use super::escape_html;

/// Shared state of the single sign-on service.
pub struct SsoState {
    sessions: SessionStore,
    provider: Arc<dyn IdentityProvider>,
}

impl SsoState {
    #[must_use]
    pub fn new(sessions: SessionStore, provider: Arc<dyn IdentityProvider>) -> Self {
        Self { sessions, provider }
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

impl std::fmt::Debug for SsoState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsoState")
            .field("sessions", &self.sessions)
            .field("provider", &self.provider.kind())
            .finish()
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    /// Authorization code issued by the provider.
    code: Option<String>,
    /// CSRF state echoed back by the provider.
    state: Option<String>,
    /// Error code when the user declined or the provider failed.
    error: Option<String>,
}

#[utoipa::path(
    get,
    path = "/auth/google",
    responses(
        (status = 303, description = "Redirect to the Google consent screen"),
        (status = 500, description = "Session could not be created")
    ),
    tag = "sso"
)]
#[instrument(skip_all)]
pub async fn google_start(headers: HeaderMap, state: Extension<Arc<SsoState>>) -> Response {
    let context = state.sessions.context(&headers).await;
    let AuthorizationRequest { url, pending } = state.provider.authorize();

    let token = match state.sessions.begin_login(&context, pending).await {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to start sign-in: {err:#}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let Ok(cookie) = session_cookie(&token, state.sessions.pending_ttl()) else {
        error!("Failed to build session cookie");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    ([(SET_COOKIE, cookie)], Redirect::to(url.as_str())).into_response()
}

#[utoipa::path(
    get,
    path = "/auth/google/callback",
    params(CallbackParams),
    responses(
        (status = 303, description = "Redirect to /profile on success, to / on failure")
    ),
    tag = "sso"
)]
#[instrument(skip_all)]
pub async fn google_callback(
    headers: HeaderMap,
    state: Extension<Arc<SsoState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let context = state.sessions.context(&headers).await;

    let principal = match complete_sign_in(&state, &context, params).await {
        Ok(principal) => principal,
        Err(err) => {
            warn!("Sign-in failed: {err}");
            if is_authenticated(&context) {
                // a stray callback does not end an existing session
                return Redirect::to("/").into_response();
            }
            state.sessions.destroy(&context).await;
            return ([(SET_COOKIE, clear_session_cookie())], Redirect::to("/")).into_response();
        }
    };

    info!(
        provider = principal.provider.as_str(),
        external_id = %principal.external_id,
        "sign-in completed"
    );

    let cookie = match state.sessions.establish(&context, principal).await {
        Ok(token) => session_cookie(&token, state.sessions.ttl()),
        Err(err) => {
            error!("Failed to store session: {err:#}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match cookie {
        Ok(cookie) => ([(SET_COOKIE, cookie)], Redirect::to("/profile")).into_response(),
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn complete_sign_in(
    state: &SsoState,
    context: &SessionContext,
    params: CallbackParams,
) -> Result<Principal, ProviderError> {
    // the pending sign-in is consumed even when the provider reports an error
    let pending = state.sessions.take_pending(context).await;

    if let Some(error) = params.error {
        return Err(ProviderError::Denied(error));
    }

    let pending = match (pending, params.state) {
        (Some(pending), Some(received)) if pending.csrf_state == received => pending,
        _ => return Err(ProviderError::StateMismatch),
    };

    let code = params
        .code
        .filter(|code| !code.is_empty())
        .ok_or(ProviderError::MissingCode)?;

    state.provider.exchange(&code, &pending).await
}

#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "Greeting for the signed-in user", content_type = "text/html"),
        (status = 303, description = "Not signed in, redirect to /")
    ),
    tag = "sso"
)]
pub async fn profile(headers: HeaderMap, state: Extension<Arc<SsoState>>) -> Response {
    let context = state.sessions.context(&headers).await;

    match require_principal(&context) {
        Ok(principal) => Html(format!(
            "<h1>Hello, {}!</h1><p>You are logged in.</p><a href=\"/logout\">Logout</a>",
            escape_html(principal.greeting_name())
        ))
        .into_response(),
        Err(redirect) => redirect.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 303, description = "Session cleared, redirect to /")
    ),
    tag = "sso"
)]
pub async fn logout(headers: HeaderMap, state: Extension<Arc<SsoState>>) -> Response {
    let context = state.sessions.context(&headers).await;
    state.sessions.destroy(&context).await;

    // Always clear the cookie, even if the session record was missing.
    ([(SET_COOKIE, clear_session_cookie())], Redirect::to("/")).into_response()
}
