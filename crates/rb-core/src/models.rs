//! # Domain Models
//!
//! These structs represent the records held by the document store.
//! We use UUID v7 for time-ordered, globally unique identification.
//! Records are append-only: nothing here is ever updated after creation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};

/// A registered account. `username` is the login lookup key but is not unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub username: String,
    /// bcrypt hash, never the plaintext
    pub password: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Builds a user around an already hashed password.
    pub fn new(name: String, address: String, username: String, password_hash: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            name,
            address,
            username,
            password: password_hash,
            created_at: Utc::now(),
        }
    }
}

/// A blog entry with ordered references into the tag and category collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    /// References may dangle; nothing checks that the target exists.
    pub tags: Vec<Uuid>,
    pub categories: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Creates a post with no tag or category references.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Result<Self> {
        Self::with_terms(title, content, Vec::new(), Vec::new())
    }

    pub fn with_terms(
        title: impl Into<String>,
        content: impl Into<String>,
        tags: Vec<Uuid>,
        categories: Vec<Uuid>,
    ) -> Result<Self> {
        let title = title.into();
        let content = content.into();
        require("post", "title", &title)?;
        require("post", "content", &content)?;

        Ok(Self {
            id: Uuid::now_v7(),
            title,
            content,
            tags,
            categories,
            created_at: Utc::now(),
        })
    }

    pub fn references(&self, kind: TermKind) -> &[Uuid] {
        match kind {
            TermKind::Tag => &self.tags,
            TermKind::Category => &self.categories,
        }
    }
}

/// Which of the two classification collections a [`Term`] lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TermKind {
    Tag,
    Category,
}

impl TermKind {
    pub fn label(self) -> &'static str {
        match self {
            TermKind::Tag => "Tag",
            TermKind::Category => "Category",
        }
    }

    /// Path prefix of the detail page, e.g. `/tags`.
    pub fn route_prefix(self) -> &'static str {
        match self {
            TermKind::Tag => "/tags",
            TermKind::Category => "/categories",
        }
    }
}

/// A tag or category record. Both collections share this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Term {
    pub id: Uuid,
    pub kind: TermKind,
    pub title: String,
    pub content: String,
    /// Back-references to posts. Post -> Term is the authoritative direction;
    /// this list is only filled by whoever creates the term.
    pub posts: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Term {
    pub fn new(kind: TermKind, title: impl Into<String>, content: impl Into<String>) -> Result<Self> {
        let title = title.into();
        let content = content.into();
        let entity = kind.label();
        require(entity, "title", &title)?;
        require(entity, "content", &content)?;

        Ok(Self {
            id: Uuid::now_v7(),
            kind,
            title,
            content,
            posts: Vec::new(),
            created_at: Utc::now(),
        })
    }
}

/// Non-empty is the only rule; whitespace counts as content.
fn require(entity: &str, field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(AppError::Validation(format!("{entity} {field} is required")));
    }
    Ok(())
}
