use std::sync::Arc;
use std::time::Instant;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::error::{GitHubError, Result};
use super::models::*;

/// Page size used when materializing the full repository list
const REPOS_PER_PAGE: usize = 100;

/// Longest non-JSON error body kept as an error message, in bytes
const MAX_ERROR_BODY: usize = 200;

/// GitHub REST API client bound to one user's OAuth token
#[derive(Clone)]
pub struct GitHubClient {
    http: Arc<reqwest::Client>,
    base_url: String,
    token: String,
}

impl GitHubClient {
    /// Create a client for `base_url` (api.github.com, GitHub Enterprise or a test double)
    pub fn new(http: Arc<reqwest::Client>, base_url: &str, token: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn repo_url(&self, owner: &str, repo: &str, path: &str) -> String {
        self.url(&format!(
            "/repos/{}/{}{}",
            urlencoding::encode(owner),
            urlencoding::encode(repo),
            path
        ))
    }

    fn contents_url(&self, owner: &str, repo: &str, path: &str) -> String {
        let encoded = encode_content_path(path);
        if encoded.is_empty() {
            self.repo_url(owner, repo, "/contents")
        } else {
            self.repo_url(owner, repo, &format!("/contents/{}", encoded))
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    /// Send a request, record metrics and decode the JSON body
    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T> {
        let started = Instant::now();
        let outcome = match request.send().await {
            Ok(response) => check_response(response).await,
            Err(e) => Err(GitHubError::Http(e)),
        };

        let status = match &outcome {
            Ok(response) => response.status().as_u16().to_string(),
            Err(e) => e
                .status()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "error".to_string()),
        };
        crate::metrics::observe_github_request(operation, &status, started.elapsed());

        let response = outcome.inspect_err(|error| {
            tracing::debug!(operation, %error, "GitHub API request failed");
        })?;

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| GitHubError::Decode(format!("{operation}: {e}")))
    }

    /// List every repository the token owner can access.
    ///
    /// Walks `/user/repos` page by page until a short page is returned, so the
    /// result is the fully materialized list.
    pub async fn list_repositories(&self) -> Result<Vec<Repository>> {
        let mut repositories = Vec::new();
        let mut page = 1usize;

        loop {
            let url = format!(
                "{}?per_page={}&page={}",
                self.url("/user/repos"),
                REPOS_PER_PAGE,
                page
            );
            let batch: Vec<Repository> = self
                .send("list_repos", self.request(Method::GET, &url))
                .await?;
            let fetched = batch.len();
            repositories.extend(batch);

            if fetched < REPOS_PER_PAGE {
                break;
            }
            page += 1;
        }

        tracing::debug!(
            count = repositories.len(),
            pages = page,
            "Fetched repository list"
        );
        Ok(repositories)
    }

    /// Get a single repository
    pub async fn get_repository(&self, owner: &str, repo: &str) -> Result<Repository> {
        let request = self.request(Method::GET, &self.repo_url(owner, repo, ""));
        self.send("get_repo", request).await
    }

    /// Create a repository owned by the authenticated user
    pub async fn create_repository(&self, body: &CreateRepositoryRequest) -> Result<Repository> {
        let request = self
            .request(Method::POST, &self.url("/user/repos"))
            .json(body);
        self.send("create_repo", request).await
    }

    /// Get the directory listing or file at `path` (empty for the root)
    pub async fn get_contents(&self, owner: &str, repo: &str, path: &str) -> Result<Contents> {
        let request = self.request(Method::GET, &self.contents_url(owner, repo, path));
        self.send("get_contents", request).await
    }

    /// Get a file; fails if `path` is a directory
    pub async fn get_file(&self, owner: &str, repo: &str, path: &str) -> Result<FileContent> {
        match self.get_contents(owner, repo, path).await? {
            Contents::File(file) => Ok(file),
            Contents::Directory(_) => Err(GitHubError::Decode(format!(
                "{} is a directory, not a file",
                path
            ))),
        }
    }

    /// Create a new file
    pub async fn create_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        message: &str,
        content: &str,
    ) -> Result<ContentCommit> {
        self.put_file("create_file", owner, repo, path, message, content, None)
            .await
    }

    /// Replace an existing file whose current blob sha is `sha`
    pub async fn update_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        message: &str,
        content: &str,
        sha: &str,
    ) -> Result<ContentCommit> {
        self.put_file("update_file", owner, repo, path, message, content, Some(sha))
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn put_file(
        &self,
        operation: &'static str,
        owner: &str,
        repo: &str,
        path: &str,
        message: &str,
        content: &str,
        sha: Option<&str>,
    ) -> Result<ContentCommit> {
        let body = PutFileRequest {
            message,
            content: STANDARD.encode(content.as_bytes()),
            sha,
        };
        let request = self
            .request(Method::PUT, &self.contents_url(owner, repo, path))
            .json(&body);
        self.send(operation, request).await
    }

    /// Delete a file whose current blob sha is `sha`
    pub async fn delete_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        message: &str,
        sha: &str,
    ) -> Result<ContentCommit> {
        let body = DeleteFileRequest { message, sha };
        let request = self
            .request(Method::DELETE, &self.contents_url(owner, repo, path))
            .json(&body);
        self.send("delete_file", request).await
    }
}

/// Percent-encode each segment of a repository path, keeping the separators
fn encode_content_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Check response status and return error if not successful
async fn check_response(response: Response) -> Result<Response> {
    let status = response.status().as_u16();

    if (200..300).contains(&status) {
        return Ok(response);
    }

    // Detect rate limiting: 403/429 with x-ratelimit-remaining: 0
    if status == 403 || status == 429 {
        let exhausted = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0");
        if exhausted {
            return Err(GitHubError::RateLimited);
        }
    }

    let body = response.text().await.unwrap_or_default();

    // Try to parse as GitHub error response
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(|m| m.as_str())
                .map(ToOwned::to_owned)
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                format!("HTTP {}", status)
            } else {
                shorten(body.trim(), MAX_ERROR_BODY)
            }
        });

    match status {
        401 => Err(GitHubError::Unauthorized),
        404 => Err(GitHubError::NotFound(message)),
        _ => Err(GitHubError::Api { status, message }),
    }
}

/// Cut `text` to at most `max` bytes on a char boundary
fn shorten(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::{encode_content_path, shorten};

    #[test]
    fn long_error_bodies_are_cut_on_char_boundaries() {
        assert_eq!(shorten("Bad Gateway", 200), "Bad Gateway");
        assert_eq!(shorten("ééé", 3), "é...");
        assert_eq!(shorten(&"x".repeat(500), 200).len(), 203);
    }

    #[test]
    fn content_paths_keep_separators_and_escape_segments() {
        assert_eq!(encode_content_path(""), "");
        assert_eq!(encode_content_path("/"), "");
        assert_eq!(encode_content_path("src/main.rs"), "src/main.rs");
        assert_eq!(
            encode_content_path("/docs/my notes.md/"),
            "docs/my%20notes.md"
        );
    }
}
