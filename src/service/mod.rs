//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate database, cache and GitHub operations.

mod account;
mod pagination;
mod repository;

pub use account::{AccountService, USERNAME_TAKEN};
pub use pagination::{Page, paginate};
pub use repository::{
    Browse, DirectoryListing, EditableFile, FileAction, RepositoryService, normalize_path,
    parent_dir,
};
