//! Repodesk - manage GitHub repositories through server-rendered pages
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Web Layer (Axum)                         │
//! │  - HTML pages, forms and flash messages                     │
//! │  - Register/login, GitHub OAuth connect                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Accounts                                                 │
//! │  - Repository listing, pagination, file CRUD                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌──────────────────────────────┐ ┌────────────────────────────┐
//! │          Data Layer          │ │       GitHub REST API      │
//! │  - SQLite users (sqlx)       │ │  - reqwest client          │
//! │  - Repo listing cache (moka) │ │                            │
//! └──────────────────────────────┘ └────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `web`: HTTP handlers and HTML templates
//! - `auth`: Sessions, login extractors, GitHub OAuth
//! - `service`: Business logic layer
//! - `github`: GitHub REST API client
//! - `data`: Database and cache layer
//! - `config`: Configuration management
//! - `error`: Error types

pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod github;
pub mod metrics;
pub mod service;
pub mod web;

use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like database pool, cache, and HTTP client.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Repository listing cache (volatile, fixed TTL)
    pub repo_cache: Arc<data::RepoListCache>,

    /// HTTP client for GitHub
    pub http_client: Arc<reqwest::Client>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database
    /// 2. Initialize the repository listing cache
    /// 3. Build the outbound HTTP client
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = data::Database::connect(&config.database.path).await?;
        metrics::USERS_TOTAL.set(db.count_users().await?);
        tracing::info!(path = %config.database.path.display(), "Database connected");

        // 2. Initialize cache
        let repo_cache = data::RepoListCache::new(
            Duration::from_secs(config.cache.repo_list_ttl),
            config.cache.repo_list_max_entries,
        );
        tracing::info!(
            ttl_secs = config.cache.repo_list_ttl,
            "Repository listing cache initialized"
        );

        // 3. Initialize HTTP client
        let http_client = reqwest::Client::builder()
            .user_agent("Repodesk/0.1.0")
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            repo_cache: Arc::new(repo_cache),
            http_client: Arc::new(http_client),
        })
    }

    /// GitHub client acting with `token`
    pub fn github(&self, token: &str) -> github::GitHubClient {
        github::GitHubClient::new(
            self.http_client.clone(),
            &self.config.github.api_base_url,
            token,
        )
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use axum::extract::DefaultBodyLimit;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let max_body_bytes = state.config.server.max_body_bytes;

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router())
        .merge(web::web_router())
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
