use thiserror::Error;

const EMPTY_REPOSITORY_MESSAGE: &str = "This repository is empty";

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected GitHub response: {0}")]
    Decode(String),

    #[error("GitHub authentication failed")]
    Unauthorized,

    #[error("GitHub rate limit exceeded")]
    RateLimited,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("OAuth error: {0}")]
    OAuth(String),
}

pub type Result<T> = std::result::Result<T, GitHubError>;

impl GitHubError {
    /// HTTP status associated with the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            GitHubError::Http(e) => e.status().map(|s| s.as_u16()),
            GitHubError::Unauthorized => Some(401),
            GitHubError::NotFound(_) => Some(404),
            GitHubError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether GitHub refused a contents request because the repository has no commits yet.
    ///
    /// GitHub answers `404` (older API versions `409`) with the message
    /// "This repository is empty." in that case.
    pub fn is_empty_repository(&self) -> bool {
        match self {
            GitHubError::NotFound(message) => message.contains(EMPTY_REPOSITORY_MESSAGE),
            GitHubError::Api { status, message } => {
                (*status == 404 || *status == 409) && message.contains(EMPTY_REPOSITORY_MESSAGE)
            }
            _ => false,
        }
    }
}
