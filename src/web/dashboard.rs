//! Repository list, creation and search

use axum::{
    Form, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};

use super::flash::Flash;
use super::{connected, failure_message, repository_service, templates};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::github::Repository;

/// Create dashboard router
///
/// Routes:
/// - GET /dashboard - Paginated repository list
/// - POST /dashboard - Create repository
/// - GET /search_repos - JSON name search
pub fn dashboard_router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(show_dashboard).post(create_repository))
        .route("/search_repos", get(search_repositories))
}

#[derive(Debug, Deserialize)]
struct DashboardQuery {
    /// Kept as text so a malformed value falls back to the first page
    page: Option<String>,
    q: Option<String>,
}

/// 1-based page number; missing, malformed and non-positive values mean 1
fn parse_page(raw: Option<&str>) -> usize {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|page| *page >= 1)
        .and_then(|page| usize::try_from(page).ok())
        .unwrap_or(1)
}

/// GET /dashboard
async fn show_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<DashboardQuery>,
    flash: Flash,
) -> Response {
    let (repositories, flash) = match connected(&state, &user, flash) {
        Ok(connected) => connected,
        Err(response) => return response,
    };

    let page = parse_page(query.page.as_deref());
    let q = query.q.as_deref().map(str::trim).unwrap_or_default();

    match repositories.dashboard_page(page, Some(q)).await {
        Ok(page) => {
            let (flash, messages) = flash.take();
            flash.render(templates::dashboard(&user, &page, q, &messages))
        }
        Err(error) => {
            error.record("dashboard");
            flash
                .error(failure_message("Could not load repositories", &error))
                .redirect("/")
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateRepositoryForm {
    #[serde(default)]
    repo_name: String,
    description: Option<String>,
    /// Checkbox: present (usually "on") when ticked
    private: Option<String>,
}

/// POST /dashboard
async fn create_repository(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
    Form(form): Form<CreateRepositoryForm>,
) -> Response {
    let (repositories, flash) = match connected(&state, &user, flash) {
        Ok(connected) => connected,
        Err(response) => return response,
    };

    let private = form
        .private
        .as_deref()
        .is_some_and(|value| matches!(value, "on" | "true" | "1" | "yes"));

    let flash = match repositories
        .create_repository(&form.repo_name, form.description.as_deref(), private)
        .await
    {
        Ok(repository) => flash.success(format!(
            "Repository \"{}\" created.",
            repository.full_name
        )),
        Err(error) => {
            error.record("create_repository");
            flash.error(failure_message("Could not create repository", &error))
        }
    };

    flash.redirect("/dashboard")
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

/// One search hit
#[derive(Debug, Serialize)]
struct RepositorySummary<'a> {
    name: &'a str,
    full_name: &'a str,
    owner: &'a str,
    private: bool,
    description: Option<&'a str>,
    /// Local repository view
    url: String,
}

impl<'a> From<&'a Repository> for RepositorySummary<'a> {
    fn from(repo: &'a Repository) -> Self {
        Self {
            name: &repo.name,
            full_name: &repo.full_name,
            owner: &repo.owner.login,
            private: repo.private,
            description: repo.description.as_deref(),
            url: templates::repo_url(&repo.owner.login, &repo.name, ""),
        }
    }
}

/// GET /search_repos
///
/// Same cached listing as the dashboard, as JSON for the search box.
async fn search_repositories(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<SearchQuery>,
) -> Response {
    let Some(repositories) = repository_service(&state, &user) else {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": "GitHub account not connected" })),
        )
            .into_response();
    };

    match repositories.list(Some(&query.q)).await {
        Ok(list) => {
            let hits: Vec<RepositorySummary<'_>> = list.iter().map(Into::into).collect();
            Json(hits).into_response()
        }
        Err(error) => {
            error.record("search_repos");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "error": error.to_string() })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_numbers_clamp_to_first_page() {
        assert_eq!(parse_page(None), 1);
        assert_eq!(parse_page(Some("3")), 3);
        assert_eq!(parse_page(Some(" 2 ")), 2);
        assert_eq!(parse_page(Some("0")), 1);
        assert_eq!(parse_page(Some("-4")), 1);
        assert_eq!(parse_page(Some("abc")), 1);
        assert_eq!(parse_page(Some("")), 1);
    }
}
