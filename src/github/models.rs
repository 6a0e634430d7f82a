//! GitHub REST API payloads
//!
//! Only the fields the pages render are modeled; unknown fields are ignored.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::GitHubError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
}

/// A repository summary as returned by `/user/repos` and `/repos/{owner}/{repo}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: RepositoryOwner,
    #[serde(default)]
    pub private: bool,
    pub description: Option<String>,
    pub html_url: String,
    pub default_branch: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    File,
    Dir,
    Symlink,
    Submodule,
}

/// One entry of a directory listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    #[serde(default)]
    pub size: u64,
    pub html_url: Option<String>,
}

impl ContentEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == ContentKind::Dir
    }
}

/// A single file with its (base64) content and blob sha
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContent {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(default)]
    pub size: u64,
    pub content: Option<String>,
    pub encoding: Option<String>,
    pub html_url: Option<String>,
}

impl FileContent {
    /// Decode the file body.
    ///
    /// GitHub wraps base64 content at 60 columns; line breaks are stripped
    /// before decoding. Content that is not UTF-8 text is rejected so the
    /// editor never rewrites a binary file.
    pub fn decoded_text(&self) -> Result<String, GitHubError> {
        let Some(content) = self.content.as_deref() else {
            return Ok(String::new());
        };

        match self.encoding.as_deref() {
            Some("base64") | None => {
                let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
                let bytes = STANDARD.decode(compact).map_err(|e| {
                    GitHubError::Decode(format!("invalid base64 content for {}: {e}", self.path))
                })?;
                String::from_utf8(bytes).map_err(|_| {
                    GitHubError::Decode(format!("{} is not a UTF-8 text file", self.path))
                })
            }
            Some(other) => Err(GitHubError::Decode(format!(
                "unsupported content encoding {other:?} for {}",
                self.path
            ))),
        }
    }
}

/// Response of `GET /repos/{owner}/{repo}/contents/{path}`
///
/// A directory answers with an array, a file with an object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Contents {
    Directory(Vec<ContentEntry>),
    File(FileContent),
}

/// Body of `POST /user/repos`
#[derive(Debug, Clone, Serialize)]
pub struct CreateRepositoryRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub private: bool,
}

/// Body of `PUT /repos/{owner}/{repo}/contents/{path}`
#[derive(Debug, Serialize)]
pub(crate) struct PutFileRequest<'a> {
    pub message: &'a str,
    /// Base64 encoded file content
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,
}

/// Body of `DELETE /repos/{owner}/{repo}/contents/{path}`
#[derive(Debug, Serialize)]
pub(crate) struct DeleteFileRequest<'a> {
    pub message: &'a str,
    pub sha: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

/// Response of file create/update/delete
#[derive(Debug, Clone, Deserialize)]
pub struct ContentCommit {
    pub content: Option<ContentEntry>,
    pub commit: CommitRef,
}
