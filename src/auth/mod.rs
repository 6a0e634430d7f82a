//! Authentication
//!
//! Handles:
//! - Local username register/login
//! - Session management
//! - Authentication extractors
//! - GitHub OAuth connect flow

mod login;
mod middleware;
mod oauth;
pub mod session;

use axum::Router;

use crate::AppState;

pub use login::AuthForm;
pub use middleware::{AuthRejection, CurrentUser, MaybeUser};
pub use oauth::OAUTH_STATE_COOKIE;
pub use session::{SESSION_COOKIE, Session, create_session_token, verify_session_token};

/// Create authentication router
///
/// Routes:
/// - POST /auth - Register or log in
/// - GET /logout - Logout
/// - GET /github/login - Redirect to GitHub
/// - GET /github/callback - OAuth callback
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .merge(login::login_router())
        .merge(oauth::oauth_router())
}
