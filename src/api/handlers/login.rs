//! `POST /login`: password login against the static credential record.
//!
//! Unknown emails and wrong passwords produce the same status and the same
//! bytes, so the endpoint does not reveal which accounts exist.

use crate::auth::{CredentialVerifier, VerifyError};
use axum::{
    Form,
    extract::{Extension, rejection::FormRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use super::escape_html;

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password.";
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred.";

/// Form body of a login attempt. Missing fields deserialize as empty strings.
#[derive(ToSchema, Deserialize, Default)]
pub struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[utoipa::path(
    post,
    path= "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "Login successful", content_type = "text/html"),
        (status = 401, description = "Unknown email or wrong password", body = String),
        (status = 500, description = "Password could not be verified", body = String),
    ),
    tag= "login"
)]
#[instrument(skip_all)]
pub async fn login(
    verifier: Extension<Arc<CredentialVerifier>>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let LoginForm { email, password } = parse_login_form(form);
    let password = SecretString::from(password);

    match verifier.verify(&email, password).await {
        Ok(()) => {
            info!("login succeeded");

            Html(format!(
                "<h1>Login Successful!</h1><p>Welcome back, {}.</p>",
                escape_html(&email)
            ))
            .into_response()
        }

        Err(VerifyError::AuthenticationFailed) => {
            info!("login rejected");

            (StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS_MESSAGE).into_response()
        }

        Err(err) => {
            error!("Error verifying password: {err}");

            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE).into_response()
        }
    }
}

// An unreadable body counts as a login with empty fields, so it gets the
// generic 401 and still costs one bcrypt round.
fn parse_login_form(form: Result<Form<LoginForm>, FormRejection>) -> LoginForm {
    match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            debug!("Failed to parse login form: {rejection}");
            LoginForm::default()
        }
    }
}
