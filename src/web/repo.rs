//! Repository browsing and file create/edit/delete

use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
};
use serde::Deserialize;

use super::flash::Flash;
use super::{connected, failure_message, templates};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::service::{Browse, FileAction, normalize_path, parent_dir};

/// Create repository router
///
/// Routes:
/// - GET /repo/:owner/:name - Directory listing
/// - GET /repo/:owner/:name/file - File form
/// - POST /repo/:owner/:name/file - Create or edit file
/// - POST /repo/:owner/:name/delete_file - Delete file
pub fn repo_router() -> Router<AppState> {
    Router::new()
        .route("/repo/:owner/:name", get(browse))
        .route("/repo/:owner/:name/file", get(file_form).post(save_file))
        .route("/repo/:owner/:name/delete_file", post(delete_file))
}

#[derive(Debug, Deserialize)]
struct BrowseQuery {
    #[serde(default)]
    path: String,
}

/// GET /repo/:owner/:name
async fn browse(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((owner, name)): Path<(String, String)>,
    Query(query): Query<BrowseQuery>,
    flash: Flash,
) -> Response {
    let (repositories, flash) = match connected(&state, &user, flash) {
        Ok(connected) => connected,
        Err(response) => return response,
    };

    match repositories.browse(&owner, &name, &query.path).await {
        Ok(Browse::File { path }) => flash.redirect(&templates::file_url(&owner, &name, &path)),
        Ok(Browse::Directory(listing)) => {
            let flash = if listing.initialized {
                flash.info("The repository was empty, so a README.md was committed.")
            } else {
                flash
            };
            let (flash, messages) = flash.take();
            flash.render(templates::repo(&user, &owner, &name, &listing, &messages))
        }
        Err(error) => {
            error.record("browse");
            flash
                .error(failure_message("Could not load repository contents", &error))
                .redirect("/dashboard")
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileQuery {
    /// File to edit; absent for a new file
    path: Option<String>,
    /// Directory a new file is created in
    #[serde(default)]
    dir: String,
}

/// GET /repo/:owner/:name/file
async fn file_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((owner, name)): Path<(String, String)>,
    Query(query): Query<FileQuery>,
    flash: Flash,
) -> Response {
    let (repositories, flash) = match connected(&state, &user, flash) {
        Ok(connected) => connected,
        Err(response) => return response,
    };

    let path = query
        .path
        .as_deref()
        .map(normalize_path)
        .filter(|path| !path.is_empty());

    let Some(path) = path else {
        let (flash, messages) = flash.take();
        let dir = normalize_path(&query.dir);
        return flash.render(templates::file_form(
            &user, &owner, &name, None, &dir, &messages,
        ));
    };

    match repositories.read_file(&owner, &name, &path).await {
        Ok(file) => {
            let (flash, messages) = flash.take();
            flash.render(templates::file_form(
                &user,
                &owner,
                &name,
                Some(&file),
                "",
                &messages,
            ))
        }
        Err(error) => {
            error.record("file_form");
            flash
                .error(failure_message("Could not load file", &error))
                .redirect(&templates::repo_url(&owner, &name, parent_dir(&path)))
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileForm {
    #[serde(default)]
    file_path: String,
    #[serde(default)]
    file_content: String,
    commit_message: Option<String>,
    #[serde(default)]
    action: String,
}

/// POST /repo/:owner/:name/file
async fn save_file(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((owner, name)): Path<(String, String)>,
    flash: Flash,
    Form(form): Form<FileForm>,
) -> Response {
    let (repositories, flash) = match connected(&state, &user, flash) {
        Ok(connected) => connected,
        Err(response) => return response,
    };

    let path = normalize_path(&form.file_path);
    let root = templates::repo_url(&owner, &name, "");

    let action = match form.action.parse::<FileAction>() {
        Ok(action) => action,
        Err(error) => {
            error.record("save_file");
            return flash
                .error(failure_message("Could not save file", &error))
                .redirect(&root);
        }
    };

    let result = repositories
        .save_file(
            &owner,
            &name,
            &path,
            &form.file_content,
            form.commit_message.as_deref(),
            action,
        )
        .await;

    match result {
        Ok(_) => {
            let message = match action {
                FileAction::Create => format!("File \"{}\" created.", path),
                FileAction::Edit => format!("File \"{}\" updated.", path),
            };
            flash
                .success(message)
                .redirect(&templates::repo_url(&owner, &name, parent_dir(&path)))
        }
        Err(error) => {
            error.record("save_file");
            // The target directory may not exist yet
            flash
                .error(failure_message("Could not save file", &error))
                .redirect(&root)
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeleteFileForm {
    #[serde(default)]
    file_path: String,
    commit_message: Option<String>,
}

/// POST /repo/:owner/:name/delete_file
async fn delete_file(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((owner, name)): Path<(String, String)>,
    flash: Flash,
    Form(form): Form<DeleteFileForm>,
) -> Response {
    let (repositories, flash) = match connected(&state, &user, flash) {
        Ok(connected) => connected,
        Err(response) => return response,
    };

    let path = normalize_path(&form.file_path);

    let (flash, dir) = match repositories
        .delete_file(&owner, &name, &path, form.commit_message.as_deref())
        .await
    {
        Ok(dir) => (flash.success(format!("File \"{}\" deleted.", path)), dir),
        Err(error) => {
            error.record("delete_file");
            (
                flash.error(failure_message("Could not delete file", &error)),
                String::new(),
            )
        }
    };

    flash.redirect(&templates::repo_url(&owner, &name, &dir))
}
