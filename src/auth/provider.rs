//! External identity providers for the redirect sign-in flow.
//!
//! Flow Overview:
//! 1) [`IdentityProvider::authorize`] builds the consent-screen URL with a
//!    random CSRF `state` and a PKCE challenge, and returns the
//!    [`PendingLogin`] the callback has to match.
//! 2) The provider redirects back with `code` + `state`.
//! 3) [`IdentityProvider::exchange`] trades the code and the PKCE verifier for
//!    an access token, fetches the user's profile, and maps it to a
//!    [`Principal`].
//!
//! The service trusts whatever identity the provider returns; it validates
//! nothing beyond HTTP success and the presence of a subject id.

use anyhow::{Context, Result};
use async_trait::async_trait;
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RequestTokenError, Scope,
    TokenResponse, TokenUrl,
    basic::{
        BasicClient, BasicErrorResponse, BasicRevocationErrorResponse,
        BasicTokenIntrospectionResponse, BasicTokenResponse,
    },
};
use reqwest::{Client, redirect};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use super::principal::{Principal, ProviderKind};

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
pub const GOOGLE_SCOPES: [&str; 2] = ["profile", "email"];
pub const CALLBACK_PATH: &str = "/auth/google/callback";

const HTTP_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider reported an error on the callback (e.g. `access_denied`).
    #[error("provider returned error: {0}")]
    Denied(String),
    #[error("callback is missing the authorization code")]
    MissingCode,
    /// No pending sign-in for this session, or the `state` did not match.
    #[error("callback state does not match the pending sign-in")]
    StateMismatch,
    /// The token endpoint answered, but not with a token.
    #[error("token exchange failed: {0}")]
    Exchange(String),
    /// The token endpoint could not be reached.
    #[error("token request failed: {0}")]
    TokenRequest(String),
    #[error("userinfo request failed: {0}")]
    Userinfo(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// What a callback has to present to finish a sign-in.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingLogin {
    pub csrf_state: String,
    pub pkce_verifier: String,
}

impl PendingLogin {
    #[must_use]
    pub fn new(csrf_state: String, pkce_verifier: String) -> Self {
        Self {
            csrf_state,
            pkce_verifier,
        }
    }
}

impl std::fmt::Debug for PendingLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingLogin")
            .field("csrf_state", &self.csrf_state)
            .field("pkce_verifier", &"***")
            .finish()
    }
}

/// A started sign-in: where to send the browser and what to keep until the
/// callback.
#[derive(Debug)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub pending: PendingLogin,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Start a sign-in attempt.
    fn authorize(&self) -> AuthorizationRequest;

    /// Redeem an authorization code for the signed-in principal.
    async fn exchange(&self, code: &str, pending: &PendingLogin)
        -> Result<Principal, ProviderError>;
}

#[derive(Clone)]
pub struct GoogleConfig {
    client_id: String,
    client_secret: SecretString,
    redirect_uri: Url,
    auth_url: Url,
    token_url: Url,
    userinfo_url: Url,
}

impl GoogleConfig {
    /// Configure Google with the callback served under `public_url`.
    ///
    /// # Errors
    /// Returns an error if `public_url` is not an absolute URL.
    pub fn new(client_id: String, client_secret: SecretString, public_url: &str) -> Result<Self> {
        let base = Url::parse(public_url)
            .with_context(|| format!("Invalid public URL: {public_url}"))?;
        let redirect_uri = base
            .join(CALLBACK_PATH)
            .context("Failed to build OAuth callback URL")?;

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
            auth_url: Url::parse(GOOGLE_AUTH_URL)?,
            token_url: Url::parse(GOOGLE_TOKEN_URL)?,
            userinfo_url: Url::parse(GOOGLE_USERINFO_URL)?,
        })
    }

    /// Point the flow at different endpoints (used against mock providers).
    #[must_use]
    pub fn with_endpoints(mut self, auth_url: Url, token_url: Url, userinfo_url: Url) -> Self {
        self.auth_url = auth_url;
        self.token_url = token_url;
        self.userinfo_url = userinfo_url;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("redirect_uri", &self.redirect_uri.as_str())
            .field("auth_url", &self.auth_url.as_str())
            .field("token_url", &self.token_url.as_str())
            .field("userinfo_url", &self.userinfo_url.as_str())
            .finish()
    }
}

/// OAuth client with the authorization and token endpoints set.
type ConfiguredClient = oauth2::Client<
    BasicErrorResponse,
    BasicTokenResponse,
    BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Subset of Google's OpenID Connect userinfo document.
#[derive(Deserialize)]
struct GoogleUserInfo {
    sub: String,
    name: Option<String>,
}

pub struct GoogleProvider {
    oauth: ConfiguredClient,
    http: Client,
    userinfo_url: Url,
}

impl GoogleProvider {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: GoogleConfig) -> Result<Self> {
        // Google accepts the client credentials in the form body
        let oauth = BasicClient::new(ClientId::new(config.client_id))
            .set_client_secret(ClientSecret::new(
                config.client_secret.expose_secret().to_string(),
            ))
            .set_auth_type(AuthType::RequestBody)
            .set_auth_uri(AuthUrl::from_url(config.auth_url))
            .set_token_uri(TokenUrl::from_url(config.token_url))
            .set_redirect_uri(RedirectUrl::from_url(config.redirect_uri));

        // following redirects from the token endpoint would leak the code
        let http = Client::builder()
            .use_rustls_tls()
            .redirect(redirect::Policy::none())
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECONDS))
            .build()
            .context("Failed to build OAuth HTTP client")?;

        Ok(Self {
            oauth,
            http,
            userinfo_url: config.userinfo_url,
        })
    }

    async fn fetch_access_token(
        &self,
        code: &str,
        pending: &PendingLogin,
    ) -> Result<String, ProviderError> {
        let token = self
            .oauth
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pending.pkce_verifier.clone()))
            .request_async(&self.http)
            .await
            .map_err(token_error)?;
        Ok(token.access_token().secret().clone())
    }

    async fn fetch_userinfo(&self, access_token: &str) -> Result<GoogleUserInfo, ProviderError> {
        let response = self
            .http
            .get(self.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Userinfo(status.to_string()));
        }

        let info: GoogleUserInfo = response
            .json()
            .await
            .map_err(|err| ProviderError::Userinfo(err.to_string()))?;
        if info.sub.trim().is_empty() {
            return Err(ProviderError::Userinfo("missing subject".to_string()));
        }
        Ok(info)
    }
}

impl std::fmt::Debug for GoogleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProvider")
            .field("client_id", &self.oauth.client_id().as_str())
            .field("userinfo_url", &self.userinfo_url.as_str())
            .finish_non_exhaustive()
    }
}

fn token_error<RE>(err: RequestTokenError<RE, BasicErrorResponse>) -> ProviderError
where
    RE: std::error::Error + 'static,
{
    match err {
        RequestTokenError::ServerResponse(response) => ProviderError::Exchange(response.to_string()),
        RequestTokenError::Request(err) => ProviderError::TokenRequest(err.to_string()),
        other => ProviderError::Exchange(other.to_string()),
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn authorize(&self) -> AuthorizationRequest {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (url, csrf_state) = self
            .oauth
            .authorize_url(CsrfToken::new_random)
            .add_scopes(GOOGLE_SCOPES.map(|scope| Scope::new(scope.to_string())))
            .set_pkce_challenge(pkce_challenge)
            .url();

        AuthorizationRequest {
            url,
            pending: PendingLogin::new(
                csrf_state.secret().clone(),
                pkce_verifier.secret().clone(),
            ),
        }
    }

    #[instrument(skip_all, fields(provider = "google"))]
    async fn exchange(
        &self,
        code: &str,
        pending: &PendingLogin,
    ) -> Result<Principal, ProviderError> {
        let access_token = self.fetch_access_token(code, pending).await?;
        let info = self.fetch_userinfo(&access_token).await?;
        debug!(sub = %info.sub, "google userinfo received");
        Ok(Principal::new(ProviderKind::Google, info.sub, info.name))
    }
}
