//! Data models
//!
//! Rust structs representing database entities.

use chrono::{DateTime, Utc};
use std::fmt;

/// Maximum username length accepted at registration
pub const USERNAME_MAX_LEN: usize = 150;

/// A local account
///
/// Created on registration. `github_token` is set once the user connects
/// a GitHub account and is never cleared.
#[derive(Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Opaque GitHub OAuth access token
    pub github_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Token to call GitHub with, if the account is connected
    pub fn github_token(&self) -> Option<&str> {
        self.github_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }
}

// The token never goes to logs.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field(
                "github_token",
                &self.github_token.as_ref().map(|_| "<redacted>"),
            )
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}
