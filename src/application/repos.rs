//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::Page;
use crate::domain::entities::{PostRecord, UserRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which posts a listing covers. The public feed sees everything; the
/// dashboard only the current actor's posts.
#[derive(Debug, Clone)]
pub enum PostListScope {
    Public,
    Author(String),
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub title: String,
    pub subtitle: String,
    pub content: String,
    pub author: String,
    pub slug: String,
    pub image: String,
}

/// Fields an edit may touch. Slug, author, image, and the creation
/// timestamp are deliberately absent.
#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub title: String,
    pub subtitle: String,
    pub content: String,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Fetch one page of posts in the given scope, newest first.
    async fn list_posts(&self, scope: &PostListScope, page: Page)
    -> Result<Vec<PostRecord>, RepoError>;

    /// Count every post in the given scope.
    async fn count_posts(&self, scope: &PostListScope) -> Result<u64, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    /// First post carrying the slug; slugs are not unique.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError>;

    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    /// Overwrite title/subtitle/content. `RepoError::NotFound` when the id
    /// does not exist.
    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    /// Remove a post. `RepoError::NotFound` when the id does not exist.
    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;
}

/// The full persistence surface the HTTP layer depends on. Implemented by
/// the Postgres adapter and by in-memory stores in tests.
pub trait BlogStore: PostsRepo + UsersRepo {}

impl<T: PostsRepo + UsersRepo> BlogStore for T {}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<UserRecord, RepoError>;
}
