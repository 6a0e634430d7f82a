//! GitHub OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with GitHub. The flow
//! does not sign anyone in: it attaches a GitHub access token to the user
//! who is already logged in locally.

use std::time::Instant;

use axum::{
    Router,
    extract::{Query, State},
    http::header,
    response::Response,
    routing::get,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use serde::Deserialize;

use super::middleware::CurrentUser;
use crate::AppState;
use crate::config::AppConfig;
use crate::data::User;
use crate::error::AppError;
use crate::github::GitHubError;
use crate::service::AccountService;
use crate::web::flash::Flash;

/// Cookie carrying the CSRF state between `/github/login` and the callback
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// Create GitHub connect router
///
/// Routes:
/// - GET /github/login - Redirect to GitHub
/// - GET /github/callback - OAuth callback
pub fn oauth_router() -> Router<AppState> {
    Router::new()
        .route("/github/login", get(github_login))
        .route("/github/callback", get(github_callback))
}

// =============================================================================
// GitHub OAuth
// =============================================================================

/// GET /github/login
///
/// Redirects the logged-in user to GitHub's authorization page.
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state in cookie
/// 3. Redirect to GitHub with client_id, redirect_uri, scope, state
async fn github_login(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
) -> Response {
    let csrf_state = generate_csrf_state();

    let authorize_url = match authorize_url(&state.config, &csrf_state) {
        Ok(url) => url,
        Err(error) => {
            error.record("github_login");
            return flash
                .error(format!("GitHub authentication failed: {}", error))
                .redirect("/");
        }
    };

    tracing::debug!(user_id = user.id, "Redirecting to GitHub authorization");

    let state_cookie = Cookie::build((OAUTH_STATE_COOKIE, csrf_state))
        .path("/")
        .http_only(true)
        .secure(state.config.should_use_secure_cookies())
        .same_site(SameSite::Lax)
        .build();

    flash.add_cookie(state_cookie).redirect(&authorize_url)
}

/// Query parameters from GitHub callback
///
/// GitHub sends `error`/`error_description` instead of `code` when the user
/// denies access.
#[derive(Debug, Deserialize)]
struct GitHubCallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// GET /github/callback
///
/// # Steps
/// 1. Verify CSRF state
/// 2. Exchange code for access token
/// 3. Store the token on the current user
/// 4. Redirect to the dashboard
async fn github_callback(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<GitHubCallbackQuery>,
    flash: Flash,
) -> Response {
    let expected_state = flash.cookie(OAUTH_STATE_COOKIE);
    let flash = flash.add_cookie(clear_state_cookie());

    match complete_authorization(&state, &user, expected_state.as_deref(), query).await {
        Ok(()) => flash
            .success("GitHub account connected successfully!")
            .redirect("/dashboard"),
        Err(error) => {
            error.record("github_callback");
            flash
                .error(format!("GitHub authentication failed: {}", error))
                .redirect("/")
        }
    }
}

async fn complete_authorization(
    state: &AppState,
    user: &User,
    expected_state: Option<&str>,
    query: GitHubCallbackQuery,
) -> Result<(), AppError> {
    if let Some(error) = query.error {
        return Err(GitHubError::OAuth(query.error_description.unwrap_or(error)).into());
    }

    verify_csrf_state(query.state.as_deref(), expected_state)?;

    let code = query
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| GitHubError::OAuth("missing authorization code".to_string()))?;

    let token = exchange_code(&state.http_client, &state.config, &code).await?;

    AccountService::new(state.db.clone())
        .connect_github(user.id, &token)
        .await
}

/// Token endpoint response
///
/// GitHub answers `200 OK` with an `error` field for a bad or reused code.
#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Exchange an authorization code for an access token
async fn exchange_code(
    http: &reqwest::Client,
    config: &AppConfig,
    code: &str,
) -> Result<String, GitHubError> {
    let redirect_uri = config.github_callback_url();
    let params = [
        ("client_id", config.github.client_id.as_str()),
        ("client_secret", config.github.client_secret.as_str()),
        ("code", code),
        ("redirect_uri", redirect_uri.as_str()),
    ];

    let started = Instant::now();
    let result = http
        .post(&config.github.access_token_url)
        .header(header::ACCEPT, "application/json")
        .form(&params)
        .send()
        .await;

    let response = match result {
        Ok(response) => response,
        Err(error) => {
            crate::metrics::observe_github_request("oauth_token", "error", started.elapsed());
            return Err(error.into());
        }
    };

    let status = response.status();
    crate::metrics::observe_github_request(
        "oauth_token",
        &status.as_u16().to_string(),
        started.elapsed(),
    );

    if !status.is_success() {
        return Err(GitHubError::OAuth(format!(
            "token endpoint returned {}",
            status
        )));
    }

    let body: AccessTokenResponse = response
        .json()
        .await
        .map_err(|e| GitHubError::Decode(format!("oauth_token: {e}")))?;

    match body.access_token.filter(|token| !token.is_empty()) {
        Some(token) => Ok(token),
        None => Err(GitHubError::OAuth(
            body.error_description
                .or(body.error)
                .unwrap_or_else(|| "no access token in response".to_string()),
        )),
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Build the GitHub authorization URL
fn authorize_url(config: &AppConfig, csrf_state: &str) -> Result<String, AppError> {
    let url = url::Url::parse_with_params(
        &config.github.authorize_url,
        &[
            ("client_id", config.github.client_id.as_str()),
            ("redirect_uri", config.github_callback_url().as_str()),
            ("scope", config.github.scope.as_str()),
            ("state", csrf_state),
        ],
    )
    .map_err(|e| AppError::Config(format!("github.authorize_url is invalid: {}", e)))?;

    Ok(url.into())
}

/// Generate a random CSRF state token
fn generate_csrf_state() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Verify CSRF state from cookie matches callback state
fn verify_csrf_state(received: Option<&str>, expected: Option<&str>) -> Result<(), AppError> {
    match (received, expected) {
        (Some(received), Some(expected)) if !expected.is_empty() && received == expected => Ok(()),
        _ => Err(GitHubError::OAuth("invalid state parameter".to_string()).into()),
    }
}

fn clear_state_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((OAUTH_STATE_COOKIE, "")).path("/").build();
    cookie.make_removal();
    cookie
}
