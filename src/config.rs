//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::{net::IpAddr, path::PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub github: GitHubConfig,
    pub cache: CacheConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 10000)
    pub port: u16,
    /// Public domain, optionally with port (e.g., "localhost:10000")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// Get the base URL for the instance
    ///
    /// # Returns
    /// Full URL like "https://repodesk.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign session and flash cookies (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 604800 = 7 days)
    pub session_max_age: i64,
}

/// GitHub OAuth application and REST API endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub access_token_url: String,
    pub api_base_url: String,
    /// OAuth scope requested on connect
    pub scope: String,
}

/// Cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Repository listing TTL in seconds (default: 300)
    pub repo_list_ttl: u64,
    /// Maximum cached listings (default: 1000)
    pub repo_list_max_entries: u64,
}

/// Page rendering configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    /// Repositories per dashboard page (default: 30)
    pub per_page: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    pub fn default_filter(&self) -> String {
        format!("repodesk={},tower_http=debug", self.level)
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (REPODESK__*)
    /// 5. Legacy variables (SECRET_KEY, GITHUB_CLIENT_ID, GITHUB_CLIENT_SECRET, DATABASE_URL)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let legacy_database_path = std::env::var("DATABASE_URL")
            .ok()
            .and_then(|url| database_path_from_url(&url))
            .map(|path| path.to_string_lossy().into_owned());

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 10000)?
            .set_default("server.domain", "localhost:10000")?
            .set_default("server.protocol", "http")?
            .set_default("server.max_body_bytes", 5 * 1024 * 1024)?
            .set_default("database.path", "data/users.db")?
            .set_default("auth.session_max_age", 604800)?
            .set_default("github.client_id", "")?
            .set_default("github.client_secret", "")?
            .set_default(
                "github.authorize_url",
                "https://github.com/login/oauth/authorize",
            )?
            .set_default(
                "github.access_token_url",
                "https://github.com/login/oauth/access_token",
            )?
            .set_default("github.api_base_url", "https://api.github.com")?
            .set_default("github.scope", "repo")?
            .set_default("cache.repo_list_ttl", 300)?
            .set_default("cache.repo_list_max_entries", 1000)?
            .set_default("ui.per_page", 30)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (REPODESK__*)
            .add_source(
                Environment::with_prefix("REPODESK")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("auth.session_secret", std::env::var("SECRET_KEY").ok())?
            .set_override_option("github.client_id", std::env::var("GITHUB_CLIENT_ID").ok())?
            .set_override_option(
                "github.client_secret",
                std::env::var("GITHUB_CLIENT_SECRET").ok(),
            )?
            .set_override_option("database.path", legacy_database_path)?
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    /// OAuth redirect URI registered with the GitHub application
    pub fn github_callback_url(&self) -> String {
        format!(
            "{}/github/callback",
            self.server.base_url().trim_end_matches('/')
        )
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.ui.per_page == 0 {
            return Err(crate::error::AppError::Config(
                "ui.per_page must be greater than 0".to_string(),
            ));
        }

        if self.cache.repo_list_ttl == 0 {
            return Err(crate::error::AppError::Config(
                "cache.repo_list_ttl must be greater than 0".to_string(),
            ));
        }

        if self.github.client_id.trim().is_empty() {
            tracing::warn!("github.client_id is empty; connecting GitHub accounts will fail");
        }

        if !self.should_use_secure_cookies() {
            let host = normalized_server_host(&self.server.domain);
            tracing::warn!(
                host = %host,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

/// Extract a filesystem path from a `sqlite:` database URL.
///
/// Accepts `sqlite:///relative.db`, `sqlite:////abs/path.db`, `sqlite://path.db`
/// and `sqlite:path.db`. Other schemes are ignored.
pub fn database_path_from_url(url: &str) -> Option<PathBuf> {
    let rest = url.trim().strip_prefix("sqlite:")?;
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    // `sqlite:///users.db` is relative, `sqlite:////tmp/users.db` is absolute
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    let rest = rest.split('?').next().unwrap_or(rest);
    if rest.is_empty() {
        return None;
    }
    Some(PathBuf::from(rest))
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    let host = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 10000,
                domain: "localhost:10000".to_string(),
                protocol: "http".to_string(),
                max_body_bytes: 1024 * 1024,
            },
            database: DatabaseConfig {
                path: PathBuf::from("/tmp/repodesk-test.db"),
            },
            auth: AuthConfig {
                session_secret: "x".repeat(32),
                session_max_age: 604_800,
            },
            github: GitHubConfig {
                client_id: "github-client-id".to_string(),
                client_secret: "github-client-secret".to_string(),
                authorize_url: "https://github.com/login/oauth/authorize".to_string(),
                access_token_url: "https://github.com/login/oauth/access_token".to_string(),
                api_base_url: "https://api.github.com".to_string(),
                scope: "repo".to_string(),
            },
            cache: CacheConfig {
                repo_list_ttl: 300,
                repo_list_max_entries: 1000,
            },
            ui: UiConfig { per_page: 30 },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_http_on_localhost() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert!(!config.should_use_secure_cookies());
    }

    #[test]
    fn validate_rejects_short_session_secret() {
        let mut config = valid_config();
        config.auth.session_secret = "short-secret".to_string();

        let error = config
            .validate()
            .expect_err("session secret shorter than 32 bytes must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("auth.session_secret")
        ));
    }

    #[test]
    fn validate_rejects_http_for_non_local_domain() {
        let mut config = valid_config();
        config.server.domain = "repodesk.example.com".to_string();
        config.server.protocol = "http".to_string();

        let error = config
            .validate()
            .expect_err("public domains must require https");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("server.protocol must be https")
        ));
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let mut config = valid_config();
        config.ui.per_page = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn callback_url_uses_public_base_url() {
        let config = valid_config();
        assert_eq!(
            config.github_callback_url(),
            "http://localhost:10000/github/callback"
        );
    }

    #[test]
    fn database_url_forms_map_to_paths() {
        assert_eq!(
            database_path_from_url("sqlite:///users.db"),
            Some(PathBuf::from("users.db"))
        );
        assert_eq!(
            database_path_from_url("sqlite:////var/lib/repodesk/users.db"),
            Some(PathBuf::from("/var/lib/repodesk/users.db"))
        );
        assert_eq!(
            database_path_from_url("sqlite:data/users.db?mode=rwc"),
            Some(PathBuf::from("data/users.db"))
        );
        assert_eq!(database_path_from_url("mongodb://localhost/users"), None);
        assert_eq!(database_path_from_url("sqlite://"), None);
    }

    #[test]
    fn logging_section_drives_default_filter() {
        let mut config = valid_config();
        config.logging.level = "debug".to_string();
        config.logging.format = "JSON".to_string();

        assert_eq!(
            config.logging.default_filter(),
            "repodesk=debug,tower_http=debug"
        );
        assert!(config.logging.is_json());
        assert!(!valid_config().logging.is_json());
    }
}
