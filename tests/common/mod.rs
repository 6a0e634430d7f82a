//! Common test utilities for E2E tests
//!
//! Each `TestServer` runs the real router on an ephemeral port with a
//! throwaway SQLite database and a wiremock double standing in for both
//! github.com (OAuth) and api.github.com.

#![allow(dead_code)]

use repodesk::{AppState, config};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use wiremock::MockServer;

pub const TEST_TOKEN: &str = "gho_test_token";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub github: MockServer,
    pub _temp_dir: TempDir,
    /// Cookie-keeping client that does not follow redirects
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_cache_ttl(300).await
    }

    /// Create a test server whose repository listing cache expires after `ttl_secs`
    pub async fn with_cache_ttl(ttl_secs: u64) -> Self {
        let github = MockServer::start().await;

        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
                max_body_bytes: 1024 * 1024,
            },
            database: config::DatabaseConfig { path: db_path },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 604800,
            },
            github: config::GitHubConfig {
                client_id: "test-client-id".to_string(),
                client_secret: "test-client-secret".to_string(),
                authorize_url: format!("{}/login/oauth/authorize", github.uri()),
                access_token_url: format!("{}/login/oauth/access_token", github.uri()),
                api_base_url: github.uri(),
                scope: "repo".to_string(),
            },
            cache: config::CacheConfig {
                repo_list_ttl: ttl_secs,
                repo_list_max_entries: 100,
            },
            ui: config::UiConfig { per_page: 30 },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        repodesk::metrics::init_metrics();

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = repodesk::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            github,
            _temp_dir: temp_dir,
            client: browser(),
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// Body of the page at `path`; consumes pending flash messages
    pub async fn page(&self, path: &str) -> String {
        let response = self.get(path).await;
        assert_eq!(response.status(), 200, "GET {path}");
        response.text().await.unwrap()
    }

    /// Register `username` and keep the session cookie
    pub async fn register(&self, username: &str) -> reqwest::Response {
        self.post_form(
            "/auth",
            &[
                ("action", "register"),
                ("username", username),
                ("password", ""),
            ],
        )
        .await
    }

    /// Register `username` and attach a GitHub token without the OAuth dance
    pub async fn register_connected(&self, username: &str) {
        let response = self.register(username).await;
        assert_eq!(location(&response), "/dashboard");

        let user = self
            .state
            .db
            .get_user_by_username(username)
            .await
            .unwrap()
            .unwrap();
        self.state
            .db
            .set_github_token(user.id, TEST_TOKEN)
            .await
            .unwrap();

        // Drain the registration flash
        self.page("/").await;
    }
}

/// Client that keeps cookies and stops at redirects
pub fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .unwrap()
}

/// `Location` header of a redirect
pub fn location(response: &reqwest::Response) -> String {
    assert!(
        response.status().is_redirection(),
        "expected redirect, got {}",
        response.status()
    );
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

pub fn repo_json(id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "full_name": format!("octocat/{name}"),
        "owner": {"login": "octocat", "id": 1},
        "private": false,
        "description": format!("The {name} repository"),
        "html_url": format!("https://github.com/octocat/{name}"),
        "default_branch": "main",
        "updated_at": "2024-01-15T10:30:00Z"
    })
}

pub fn file_json(path: &str, sha: &str, content: &str) -> Value {
    use base64::Engine as _;

    let name = path.rsplit('/').next().unwrap_or(path);
    json!({
        "type": "file",
        "name": name,
        "path": path,
        "sha": sha,
        "size": content.len(),
        "encoding": "base64",
        "content": base64::engine::general_purpose::STANDARD.encode(content),
        "html_url": format!("https://github.com/octocat/hello/blob/main/{path}")
    })
}

pub fn entry_json(path: &str, kind: &str) -> Value {
    let name = path.rsplit('/').next().unwrap_or(path);
    json!({
        "type": kind,
        "name": name,
        "path": path,
        "sha": format!("sha-{name}"),
        "size": 12,
        "html_url": null
    })
}

pub fn commit_json(sha: &str) -> Value {
    json!({
        "content": null,
        "commit": {"sha": sha}
    })
}
