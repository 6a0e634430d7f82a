//! Repository service
//!
//! Listing (through the TTL cache), creation, browsing and file CRUD on
//! behalf of one user. Every call goes straight to GitHub except the
//! listing, which is served from [`RepoListCache`] while fresh.

use std::str::FromStr;
use std::sync::Arc;

use crate::data::{RepoListCache, RepoListKey};
use crate::error::AppError;
use crate::github::{
    ContentCommit, ContentEntry, Contents, CreateRepositoryRequest, GitHubClient, Repository,
};

use super::pagination::{Page, paginate};

/// File created in a repository that has no commits yet
const PLACEHOLDER_FILE: &str = "README.md";
const PLACEHOLDER_MESSAGE: &str = "Initial commit";

/// What the file form submits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Create,
    Edit,
}

impl FileAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileAction::Create => "create",
            FileAction::Edit => "edit",
        }
    }
}

impl FromStr for FileAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(FileAction::Create),
            "edit" => Ok(FileAction::Edit),
            other => Err(AppError::Validation(format!("Unknown file action: {other}"))),
        }
    }
}

/// Directory view of a repository
#[derive(Debug, Clone)]
pub struct DirectoryListing {
    pub repository: Repository,
    /// Directory path, empty for the root
    pub path: String,
    /// Directories first, then by name
    pub entries: Vec<ContentEntry>,
    /// Whether the placeholder file was just committed to an empty repository
    pub initialized: bool,
}

/// Outcome of browsing a path
#[derive(Debug, Clone)]
pub enum Browse {
    Directory(DirectoryListing),
    /// The path is a file; show its form instead
    File { path: String },
}

/// A file loaded for editing
#[derive(Debug, Clone)]
pub struct EditableFile {
    pub path: String,
    pub sha: String,
    pub text: String,
}

/// Repository service
pub struct RepositoryService {
    github: GitHubClient,
    cache: Arc<RepoListCache>,
    user_id: i64,
    per_page: usize,
}

impl RepositoryService {
    /// Create a service acting with `github` for local user `user_id`
    pub fn new(
        github: GitHubClient,
        cache: Arc<RepoListCache>,
        user_id: i64,
        per_page: usize,
    ) -> Self {
        Self {
            github,
            cache,
            user_id,
            per_page,
        }
    }

    /// Repositories whose name contains `query` (case-insensitive), cached per
    /// user and normalized query for the cache TTL.
    pub async fn list(&self, query: Option<&str>) -> Result<Arc<Vec<Repository>>, AppError> {
        let key = RepoListKey::new(self.user_id, query);
        let needle = key.query.clone();

        let repositories = self
            .cache
            .get_or_fetch(key, || async move {
                let all = self.github.list_repositories().await?;
                Ok::<_, AppError>(filter_by_name(all, &needle))
            })
            .await?;

        Ok(repositories)
    }

    /// Page `page` (1-based) of the cached listing
    pub async fn dashboard_page(
        &self,
        page: usize,
        query: Option<&str>,
    ) -> Result<Page<Repository>, AppError> {
        let repositories = self.list(query).await?;
        Ok(paginate(&repositories, page, self.per_page))
    }

    /// Create a repository for the token owner.
    ///
    /// The collision check runs against a fresh, uncached listing. The cache
    /// is left alone, so the new repository shows up once entries expire.
    pub async fn create_repository(
        &self,
        name: &str,
        description: Option<&str>,
        private: bool,
    ) -> Result<Repository, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation(
                "Repository name is required.".to_string(),
            ));
        }

        let existing = self.github.list_repositories().await?;
        if existing
            .iter()
            .any(|repo| repo.name.eq_ignore_ascii_case(name))
        {
            return Err(AppError::Conflict(format!(
                "A repository named \"{}\" already exists.",
                name
            )));
        }

        let request = CreateRepositoryRequest {
            name: name.to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            private,
        };
        let repository = self.github.create_repository(&request).await?;

        tracing::info!(
            user_id = self.user_id,
            repository = %repository.full_name,
            private,
            "Repository created"
        );
        Ok(repository)
    }

    /// List the directory at `path`.
    ///
    /// An empty repository gets a placeholder `README.md` committed and the
    /// listing is fetched once more; a second failure is returned as is.
    pub async fn browse(&self, owner: &str, name: &str, path: &str) -> Result<Browse, AppError> {
        let repository = self.github.get_repository(owner, name).await?;
        let path = normalize_path(path);
        let mut initialized = false;

        let contents = match self.github.get_contents(owner, name, &path).await {
            Ok(contents) => contents,
            Err(error) if error.is_empty_repository() => {
                tracing::info!(
                    repository = %repository.full_name,
                    "Repository is empty, committing placeholder"
                );
                self.github
                    .create_file(
                        owner,
                        name,
                        PLACEHOLDER_FILE,
                        PLACEHOLDER_MESSAGE,
                        &format!("# {}\n", repository.name),
                    )
                    .await?;
                initialized = true;
                self.github.get_contents(owner, name, &path).await?
            }
            Err(error) => return Err(error.into()),
        };

        match contents {
            Contents::File(file) => Ok(Browse::File { path: file.path }),
            Contents::Directory(mut entries) => {
                sort_entries(&mut entries);
                Ok(Browse::Directory(DirectoryListing {
                    repository,
                    path,
                    entries,
                    initialized,
                }))
            }
        }
    }

    /// Load a file and decode its content for the edit form
    pub async fn read_file(
        &self,
        owner: &str,
        name: &str,
        path: &str,
    ) -> Result<EditableFile, AppError> {
        let path = normalize_path(path);
        let file = self.github.get_file(owner, name, &path).await?;
        let text = file.decoded_text()?;

        Ok(EditableFile {
            path: file.path,
            sha: file.sha,
            text,
        })
    }

    /// Create or update a file.
    ///
    /// `Edit` fetches the current blob sha first so GitHub can reject a
    /// concurrent change.
    pub async fn save_file(
        &self,
        owner: &str,
        name: &str,
        path: &str,
        content: &str,
        message: Option<&str>,
        action: FileAction,
    ) -> Result<ContentCommit, AppError> {
        let path = required_path(path)?;
        let content = content.replace("\r\n", "\n");

        let commit = match action {
            FileAction::Create => {
                let message = commit_message(message, "Create", &path);
                self.github
                    .create_file(owner, name, &path, &message, &content)
                    .await?
            }
            FileAction::Edit => {
                let current = self.github.get_file(owner, name, &path).await?;
                let message = commit_message(message, "Update", &current.path);
                self.github
                    .update_file(owner, name, &current.path, &message, &content, &current.sha)
                    .await?
            }
        };

        tracing::info!(
            owner,
            repository = name,
            path = %path,
            action = action.as_str(),
            commit = %commit.commit.sha,
            "File saved"
        );
        Ok(commit)
    }

    /// Delete a file, returning the directory that contained it
    pub async fn delete_file(
        &self,
        owner: &str,
        name: &str,
        path: &str,
        message: Option<&str>,
    ) -> Result<String, AppError> {
        let path = required_path(path)?;
        let current = self.github.get_file(owner, name, &path).await?;
        let message = commit_message(message, "Delete", &current.path);

        let commit = self
            .github
            .delete_file(owner, name, &current.path, &message, &current.sha)
            .await?;

        tracing::info!(
            owner,
            repository = name,
            path = %current.path,
            commit = %commit.commit.sha,
            "File deleted"
        );
        Ok(parent_dir(&current.path).to_string())
    }
}

/// Keep repositories whose name contains `needle` (already lowercased)
fn filter_by_name(repositories: Vec<Repository>, needle: &str) -> Vec<Repository> {
    if needle.is_empty() {
        return repositories;
    }
    repositories
        .into_iter()
        .filter(|repo| repo.name.to_lowercase().contains(needle))
        .collect()
}

fn sort_entries(entries: &mut [ContentEntry]) {
    entries.sort_by(|a, b| {
        b.is_dir()
            .cmp(&a.is_dir())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// Strip surrounding whitespace and slashes; the root is ""
pub fn normalize_path(path: &str) -> String {
    path.trim().trim_matches('/').to_string()
}

fn required_path(path: &str) -> Result<String, AppError> {
    let path = normalize_path(path);
    if path.is_empty() {
        return Err(AppError::Validation("File path is required.".to_string()));
    }
    Ok(path)
}

fn commit_message(message: Option<&str>, verb: &str, path: &str) -> String {
    match message.map(str::trim).filter(|m| !m.is_empty()) {
        Some(message) => message.to_string(),
        None => format!("{} {}", verb, path),
    }
}

/// Directory part of `path`, empty for top-level files
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}
