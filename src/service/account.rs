//! Account service
//!
//! Registration, username login and GitHub token storage.

use std::sync::Arc;

use crate::data::{Database, USERNAME_MAX_LEN, User};
use crate::error::AppError;

pub const USERNAME_TAKEN: &str = "Username is already taken. Please choose another one.";

/// Account service
pub struct AccountService {
    db: Arc<Database>,
}

impl AccountService {
    /// Create new account service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Register a new user
    ///
    /// The username is checked up front; the `UNIQUE` constraint catches a
    /// concurrent registration of the same name and is reported the same way.
    ///
    /// # Errors
    /// * `Validation` - blank, too long or containing control characters
    /// * `Conflict` - username already registered
    pub async fn register(&self, username: &str) -> Result<User, AppError> {
        let username = validate_username(username)?;

        if self.db.get_user_by_username(username).await?.is_some() {
            return Err(AppError::Conflict(USERNAME_TAKEN.to_string()));
        }

        let user = self.db.insert_user(username).await.map_err(|e| match e {
            AppError::Conflict(_) => AppError::Conflict(USERNAME_TAKEN.to_string()),
            other => other,
        })?;

        if let Ok(count) = self.db.count_users().await {
            crate::metrics::USERS_TOTAL.set(count);
        }
        tracing::info!(user_id = user.id, username = %user.username, "User registered");

        Ok(user)
    }

    /// Look up a user by username
    ///
    /// There is no password: login succeeds iff the username exists.
    pub async fn login(&self, username: &str) -> Result<Option<User>, AppError> {
        let username = username.trim();
        if username.is_empty() {
            return Ok(None);
        }

        let user = self.db.get_user_by_username(username).await?;
        match &user {
            Some(user) => tracing::info!(user_id = user.id, "User logged in"),
            None => tracing::debug!(username, "Login for unknown username"),
        }
        Ok(user)
    }

    /// Store the GitHub OAuth token obtained for `user_id`
    pub async fn connect_github(&self, user_id: i64, token: &str) -> Result<(), AppError> {
        if token.trim().is_empty() {
            return Err(AppError::Validation(
                "GitHub returned an empty access token".to_string(),
            ));
        }

        self.db.set_github_token(user_id, token).await?;
        tracing::info!(user_id, "GitHub account connected");
        Ok(())
    }
}

fn validate_username(raw: &str) -> Result<&str, AppError> {
    let username = raw.trim();

    if username.is_empty() {
        return Err(AppError::Validation("Username is required.".to_string()));
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(AppError::Validation(format!(
            "Username must be at most {} characters.",
            USERNAME_MAX_LEN
        )));
    }
    if username.chars().any(char::is_control) {
        return Err(AppError::Validation(
            "Username must not contain control characters.".to_string(),
        ));
    }

    Ok(username)
}
