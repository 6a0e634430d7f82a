//! Authentication extractors
//!
//! Protects routes that require a logged-in user.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;

use super::session::{SESSION_COOKIE, Session, clear_session_cookie, verify_session_token};
use crate::AppState;
use crate::data::User;
use crate::error::AppError;
use crate::web::flash::Flash;

/// Resolve the logged-in user from the session cookie.
///
/// Returns `Ok(None)` for a missing, forged or expired cookie, and for a
/// session whose user no longer exists.
async fn authenticate(jar: &CookieJar, state: &AppState) -> Result<Option<User>, AppError> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };

    let session: Session =
        match verify_session_token(cookie.value(), &state.config.auth.session_secret) {
            Ok(session) => session,
            Err(error) => {
                tracing::debug!(%error, "Ignoring invalid session cookie");
                return Ok(None);
            }
        };

    state.db.get_user(session.user_id).await
}

/// Rejection for routes that require login
pub enum AuthRejection {
    /// Not logged in: redirect to the landing page with a warning
    LoginRequired(Response),
    /// Lookup failed
    Failed(AppError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::LoginRequired(response) => response,
            AuthRejection::Failed(error) => error.into_response(),
        }
    }
}

/// Extractor for current authenticated user
///
/// Use in handlers to get the current user.
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentUser(user): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}", user.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<User>().cloned() {
            return Ok(CurrentUser(user));
        }

        let state = AppState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);

        match authenticate(&jar, &state).await {
            Ok(Some(user)) => {
                parts.extensions.insert(user.clone());
                Ok(CurrentUser(user))
            }
            Ok(None) => {
                let response = Flash::new(jar, state.config.clone())
                    .add_cookie(clear_session_cookie())
                    .warning("Please log in to access this page.")
                    .redirect("/");
                Err(AuthRejection::LoginRequired(response))
            }
            Err(error) => Err(AuthRejection::Failed(error)),
        }
    }
}

/// Optional current user extractor
///
/// Returns None if not authenticated, instead of redirecting.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<User>().cloned() {
            return Ok(MaybeUser(Some(user)));
        }

        let app_state = AppState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let user = authenticate(&jar, &app_state).await?;

        if let Some(user) = &user {
            parts.extensions.insert(user.clone());
        }

        Ok(MaybeUser(user))
    }
}
