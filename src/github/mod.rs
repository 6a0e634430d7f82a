//! GitHub REST API proxy
//!
//! Thin typed wrapper over the repository and contents endpoints used by
//! the web pages. Every call is made with the current user's OAuth token.

mod client;
mod error;
mod models;

pub use client::GitHubClient;
pub use error::GitHubError;
pub use models::*;
