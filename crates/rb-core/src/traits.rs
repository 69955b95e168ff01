//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use crate::error::Result;
use crate::models::{Post, Term, TermKind, User};
use uuid::Uuid;

/// Data persistence contract for users, posts, tags and categories.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait BlogRepo: Send + Sync {
    // User Operations
    async fn create_user(&self, user: User) -> Result<()>;
    /// Returns the earliest registered user with this exact username.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    // Post Operations
    async fn create_post(&self, post: Post) -> Result<()>;
    /// All posts, oldest first.
    async fn list_posts(&self) -> Result<Vec<Post>>;
    async fn get_post(&self, id: Uuid) -> Result<Option<Post>>;

    // Tag / Category Operations
    async fn create_term(&self, term: Term) -> Result<()>;
    async fn get_term(&self, kind: TermKind, id: Uuid) -> Result<Option<Term>>;
    /// Posts whose `tags` (or `categories`) array contains `id`, oldest first.
    async fn posts_with_term(&self, kind: TermKind, id: Uuid) -> Result<Vec<Post>>;
}

/// Password hashing contract.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Produces a salted one-way hash of `password`.
    async fn hash_password(&self, password: &str) -> Result<String>;

    /// Compares a plaintext password against a stored hash.
    /// Malformed hashes never verify.
    async fn verify_password(&self, password: &str, hash: &str) -> bool;
}
