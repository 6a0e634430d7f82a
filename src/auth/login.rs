//! Local register/login and logout
//!
//! Accounts are identified by username alone. The landing page posts a
//! single form to `/auth` with `action` set to `register` or `login`.

use axum::{Form, Router, extract::State, response::Response, routing::get, routing::post};
use serde::Deserialize;

use super::middleware::CurrentUser;
use super::session::{Session, clear_session_cookie, create_session_token, session_cookie};
use crate::AppState;
use crate::data::User;
use crate::error::AppError;
use crate::service::AccountService;
use crate::web::failure_message;
use crate::web::flash::Flash;

/// Create local account router
///
/// Routes:
/// - POST /auth - Register or log in
/// - GET /logout - Logout
pub fn login_router() -> Router<AppState> {
    Router::new()
        .route("/auth", post(authenticate))
        .route("/logout", get(logout))
}

/// Landing page form
#[derive(Debug, Deserialize)]
pub struct AuthForm {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub username: String,
    /// Accepted for form compatibility; never checked
    #[serde(default)]
    pub password: String,
}

/// POST /auth
async fn authenticate(
    State(state): State<AppState>,
    flash: Flash,
    Form(form): Form<AuthForm>,
) -> Response {
    let accounts = AccountService::new(state.db.clone());

    match form.action.as_str() {
        "register" => match accounts.register(&form.username).await {
            Ok(user) => match start_session(&state, flash, &user) {
                Ok(flash) => flash
                    .success("Registration successful! You are now logged in.")
                    .redirect("/dashboard"),
                Err((flash, error)) => fail(flash, error, "auth"),
            },
            Err(error) => fail(flash, error, "auth"),
        },
        "login" => match accounts.login(&form.username).await {
            Ok(Some(user)) => match start_session(&state, flash, &user) {
                Ok(flash) => flash
                    .success("Logged in successfully!")
                    .redirect("/dashboard"),
                Err((flash, error)) => fail(flash, error, "auth"),
            },
            Ok(None) => flash
                .error("Invalid username or password")
                .redirect("/"),
            Err(error) => fail(flash, error, "auth"),
        },
        other => {
            tracing::debug!(action = other, "Unknown auth action");
            flash.error("Invalid action").redirect("/")
        }
    }
}

/// GET /logout
async fn logout(CurrentUser(user): CurrentUser, flash: Flash) -> Response {
    tracing::info!(user_id = user.id, "User logged out");
    flash
        .add_cookie(clear_session_cookie())
        .success("Logged out")
        .redirect("/")
}

fn start_session(state: &AppState, flash: Flash, user: &User) -> Result<Flash, (Flash, AppError)> {
    let session = Session::for_user(user, state.config.auth.session_max_age);
    match create_session_token(&session, &state.config.auth.session_secret) {
        Ok(token) => Ok(flash.add_cookie(session_cookie(
            token,
            state.config.should_use_secure_cookies(),
        ))),
        Err(error) => Err((flash, error)),
    }
}

fn fail(flash: Flash, error: AppError, endpoint: &str) -> Response {
    error.record(endpoint);
    flash
        .error(failure_message("Something went wrong", &error))
        .redirect("/")
}
