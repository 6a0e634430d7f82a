//! Data layer module
//!
//! Handles all data persistence and caching:
//! - SQLite database operations (users)
//! - Repository listing cache (volatile)

mod cache;
mod database;
mod models;

pub use cache::{RepoListCache, RepoListKey};
pub use database::Database;
pub use models::*;
