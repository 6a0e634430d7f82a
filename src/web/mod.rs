//! HTML front end
//!
//! Page handlers. Failures from GitHub or the database are turned into a
//! flash message and a redirect; only extractor failures render an error page.

mod dashboard;
pub mod flash;
mod home;
mod metrics;
mod repo;
pub mod templates;

use axum::Router;
use axum::response::Response;

use crate::AppState;
use crate::data::User;
use crate::error::AppError;
use crate::service::RepositoryService;
use flash::Flash;

/// Create the page router
pub fn web_router() -> Router<AppState> {
    Router::new()
        .merge(home::home_router())
        .merge(dashboard::dashboard_router())
        .merge(repo::repo_router())
        .merge(metrics::metrics_router())
}

/// Repository service acting with the user's GitHub token, if connected
fn repository_service(state: &AppState, user: &User) -> Option<RepositoryService> {
    let token = user.github_token()?;
    Some(RepositoryService::new(
        state.github(token),
        state.repo_cache.clone(),
        user.id,
        state.config.ui.per_page,
    ))
}

/// Like [`repository_service`], but sends unconnected users to the OAuth flow
fn connected(
    state: &AppState,
    user: &User,
    flash: Flash,
) -> Result<(RepositoryService, Flash), Response> {
    match repository_service(state, user) {
        Some(service) => Ok((service, flash)),
        None => Err(flash
            .warning("Please connect your GitHub account first")
            .redirect("/github/login")),
    }
}

/// Text flashed for a failed operation
pub(crate) fn failure_message(context: &str, error: &AppError) -> String {
    match error {
        AppError::Validation(message) | AppError::Conflict(message) => message.clone(),
        AppError::GitHub(error) => format!("{}: {}", context, error),
        _ => format!("{}. Please try again.", context),
    }
}
