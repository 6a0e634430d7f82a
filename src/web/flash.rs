//! One-shot flash messages
//!
//! Messages are queued in a signed `flash` cookie by the handler that
//! redirects and consumed by the next page that renders.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use crate::AppState;
use crate::auth::session::{open, seal};
use crate::config::AppConfig;

pub const FLASH_COOKIE: &str = "flash";

/// Cap on queued messages so the cookie stays small
const MAX_QUEUED: usize = 8;

/// Longest message kept, in bytes; keeps the cookie under the 4 KiB browser limit
const MAX_MESSAGE_BYTES: usize = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Success,
    Error,
    Warning,
    Info,
}

impl FlashCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashCategory::Success => "success",
            FlashCategory::Error => "error",
            FlashCategory::Warning => "warning",
            FlashCategory::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub category: FlashCategory,
    pub message: String,
}

/// Cookie jar plus the signing secret, extracted per request
///
/// Handlers queue messages and then either redirect or render a page:
///
/// ```ignore
/// async fn handler(flash: Flash) -> Response {
///     flash.error("Something failed").redirect("/")
/// }
/// ```
pub struct Flash {
    jar: CookieJar,
    config: Arc<AppConfig>,
}

impl Flash {
    pub fn new(jar: CookieJar, config: Arc<AppConfig>) -> Self {
        Self { jar, config }
    }

    fn queued(&self) -> Vec<FlashMessage> {
        self.jar
            .get(FLASH_COOKIE)
            .and_then(|cookie| open::<Vec<FlashMessage>>(cookie.value(), self.secret()).ok())
            .unwrap_or_default()
    }

    fn secret(&self) -> &str {
        &self.config.auth.session_secret
    }

    /// Queue a message for the next rendered page
    pub fn push(mut self, category: FlashCategory, message: impl Into<String>) -> Self {
        let mut messages = self.queued();
        let mut message = message.into();
        if message.len() > MAX_MESSAGE_BYTES {
            let mut end = MAX_MESSAGE_BYTES;
            while !message.is_char_boundary(end) {
                end -= 1;
            }
            message.truncate(end);
            message.push_str("...");
        }
        messages.push(FlashMessage { category, message });
        if messages.len() > MAX_QUEUED {
            messages.drain(..messages.len() - MAX_QUEUED);
        }

        match seal(&messages, self.secret()) {
            Ok(value) => {
                let cookie = Cookie::build((FLASH_COOKIE, value))
                    .path("/")
                    .http_only(true)
                    .secure(self.config.should_use_secure_cookies())
                    .same_site(SameSite::Lax)
                    .build();
                self.jar = self.jar.add(cookie);
            }
            Err(error) => tracing::error!(%error, "Failed to sign flash cookie"),
        }
        self
    }

    pub fn success(self, message: impl Into<String>) -> Self {
        self.push(FlashCategory::Success, message)
    }

    pub fn error(self, message: impl Into<String>) -> Self {
        self.push(FlashCategory::Error, message)
    }

    pub fn warning(self, message: impl Into<String>) -> Self {
        self.push(FlashCategory::Warning, message)
    }

    pub fn info(self, message: impl Into<String>) -> Self {
        self.push(FlashCategory::Info, message)
    }

    /// Add an unrelated cookie (e.g. the session) to the same response
    pub fn add_cookie(mut self, cookie: Cookie<'static>) -> Self {
        self.jar = self.jar.add(cookie);
        self
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.jar.get(name).map(|c| c.value().to_string())
    }

    /// Consume queued messages; the cookie is cleared on the response
    pub fn take(mut self) -> (Self, Vec<FlashMessage>) {
        let messages = self.queued();
        if self.jar.get(FLASH_COOKIE).is_some() {
            let mut removal = Cookie::build((FLASH_COOKIE, "")).path("/").build();
            removal.make_removal();
            self.jar = self.jar.add(removal);
        }
        (self, messages)
    }

    pub fn redirect(self, to: &str) -> Response {
        (self.jar, Redirect::to(to)).into_response()
    }

    pub fn render(self, page: String) -> Response {
        (self.jar, Html(page)).into_response()
    }

    pub fn into_jar(self) -> CookieJar {
        self.jar
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Flash
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(Flash::new(jar, app_state.config.clone()))
    }
}
