use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    models::{Comment, CommentInput, NewUser, Post, PostInput, Role, User, UserChanges},
    validation::Page,
};

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// RepositoryError
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A write collided with a unique column (username, email).
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::UniqueViolation(db.message().to_string())
            }
            _ => RepositoryError::Database(err),
        }
    }
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The Data Store contract. Handlers and the auth guard depend only on this trait, so
/// the Postgres store and the in-process store are interchangeable.
///
/// Every listing returns records in ascending id order, so a page is deterministic for
/// a fixed dataset. Search methods receive the raw search term and match it as a
/// literal, case-sensitive substring: `%` and `_` in the term are ordinary characters.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn list_users(&self, page: Page) -> RepoResult<Vec<User>>;
    async fn search_users_by_username(&self, term: &str, page: Page) -> RepoResult<Vec<User>>;
    async fn get_user(&self, id: i32) -> RepoResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    /// Every user whose username OR email matches. One query for both columns.
    async fn find_users_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> RepoResult<Vec<User>>;
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    /// Replaces all writable fields. `None` if the user does not exist.
    async fn update_user(&self, id: i32, changes: UserChanges) -> RepoResult<Option<User>>;
    /// True if a row was removed.
    async fn delete_user(&self, id: i32) -> RepoResult<bool>;

    // --- Roles ---
    async fn get_role(&self, id: i32) -> RepoResult<Option<Role>>;

    // --- Posts ---
    async fn list_posts(&self, page: Page) -> RepoResult<Vec<Post>>;
    /// Matches `term` against the decimal text of `user_id`.
    async fn search_posts_by_user_id(&self, term: &str, page: Page) -> RepoResult<Vec<Post>>;
    async fn get_post(&self, id: i32) -> RepoResult<Option<Post>>;
    async fn create_post(&self, post: &PostInput) -> RepoResult<Post>;
    async fn update_post(&self, id: i32, post: &PostInput) -> RepoResult<Option<Post>>;
    async fn delete_post(&self, id: i32) -> RepoResult<bool>;

    // --- Comments ---
    async fn list_comments(&self, page: Page) -> RepoResult<Vec<Comment>>;
    async fn search_comments_by_username(&self, term: &str, page: Page)
    -> RepoResult<Vec<Comment>>;
    async fn get_comment(&self, id: i32) -> RepoResult<Option<Comment>>;
    async fn create_comment(&self, comment: &CommentInput) -> RepoResult<Comment>;
    async fn update_comment(&self, id: i32, comment: &CommentInput)
    -> RepoResult<Option<Comment>>;
    async fn delete_comment(&self, id: i32) -> RepoResult<bool>;
}

/// RepositoryState
///
/// The shared handle to the Data Store held in the application state.
pub type RepositoryState = Arc<dyn Repository>;
