//! # rb-db-sqlite Implementation
//!
//! This module implements the document store on top of SQLite.
//! Every collection is one table; reference arrays (post -> tags, post -> categories,
//! term -> posts) are kept as JSON arrays of ids and searched with `json_each`.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rb_core::models::{Post, Term, TermKind, User};
use rb_core::traits::BlogRepo;
use rb_core::error::{AppError, Result};
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::types::Json;
use sqlx::Row;
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id         BLOB PRIMARY KEY,
    name       TEXT NOT NULL,
    address    TEXT NOT NULL,
    username   TEXT NOT NULL,
    password   TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_users_username ON users (username);

CREATE TABLE IF NOT EXISTS posts (
    id         BLOB PRIMARY KEY,
    title      TEXT NOT NULL CHECK (length(title) > 0),
    content    TEXT NOT NULL CHECK (length(content) > 0),
    tags       TEXT NOT NULL DEFAULT '[]',
    categories TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tags (
    id         BLOB PRIMARY KEY,
    title      TEXT NOT NULL CHECK (length(title) > 0),
    content    TEXT NOT NULL CHECK (length(content) > 0),
    posts      TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    id         BLOB PRIMARY KEY,
    title      TEXT NOT NULL CHECK (length(title) > 0),
    content    TEXT NOT NULL CHECK (length(content) > 0),
    posts      TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);
"#;

const POST_COLUMNS: &str = "id, title, content, tags, categories, created_at";

/// How hard to try when the store is unreachable at startup.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given (1-based) failed attempt.
    /// Doubles every attempt, capped at `max_delay`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

pub struct SqliteBlogRepo {
    pool: SqlitePool,
}

impl SqliteBlogRepo {
    /// Opens the pool and creates missing tables. Single attempt.
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_err)?
            .create_if_missing(true);

        // Every in-memory connection is its own database, so keep exactly one alive.
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };

        let pool = pool_options.connect_with(options).await.map_err(db_err)?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await.map_err(db_err)?;

        Ok(Self { pool })
    }

    /// Like [`SqliteBlogRepo::new`], retrying with exponential backoff.
    /// Returns the last error once `policy.max_attempts` is exhausted.
    pub async fn connect_with_retry(url: &str, policy: &RetryPolicy) -> Result<Self> {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match Self::new(url).await {
                Ok(repo) => {
                    log::info!("Connected to document store at {url}");
                    return Ok(repo);
                }
                Err(err) if attempt < max_attempts => {
                    let delay = policy.delay_after(attempt);
                    log::warn!(
                        "Store connection attempt {attempt}/{max_attempts} failed: {err}; retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    log::error!("Giving up on store after {max_attempts} attempts: {err}");
                    return Err(err);
                }
            }
        }
    }
}

fn db_err(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if matches!(db.kind(), ErrorKind::CheckViolation | ErrorKind::NotNullViolation) {
            return AppError::Validation(db.message().to_string());
        }
    }
    AppError::internal(err)
}

fn term_table(kind: TermKind) -> &'static str {
    match kind {
        TermKind::Tag => "tags",
        TermKind::Category => "categories",
    }
}

/// Name of the reference array on `posts` pointing into `kind`'s table.
fn post_reference_column(kind: TermKind) -> &'static str {
    match kind {
        TermKind::Tag => "tags",
        TermKind::Category => "categories",
    }
}

fn user_from_row(row: &SqliteRow) -> sqlx::Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        username: row.try_get("username")?,
        password: row.try_get("password")?,
        created_at: row.try_get("created_at")?,
    })
}

fn post_from_row(row: &SqliteRow) -> sqlx::Result<Post> {
    Ok(Post {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        tags: row.try_get::<Json<Vec<Uuid>>, _>("tags")?.0,
        categories: row.try_get::<Json<Vec<Uuid>>, _>("categories")?.0,
        created_at: row.try_get("created_at")?,
    })
}

fn term_from_row(kind: TermKind, row: &SqliteRow) -> sqlx::Result<Term> {
    Ok(Term {
        id: row.try_get("id")?,
        kind,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        posts: row.try_get::<Json<Vec<Uuid>>, _>("posts")?.0,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl BlogRepo for SqliteBlogRepo {
    async fn create_user(&self, user: User) -> Result<()> {
        sqlx::query("INSERT INTO users (id, name, address, username, password, created_at) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(user.id)
            .bind(user.name)
            .bind(user.address)
            .bind(user.username)
            .bind(user.password)
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ? ORDER BY rowid ASC LIMIT 1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(user_from_row).transpose().map_err(db_err)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(user_from_row).transpose().map_err(db_err)
    }

    async fn create_post(&self, post: Post) -> Result<()> {
        sqlx::query("INSERT INTO posts (id, title, content, tags, categories, created_at) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(post.id)
            .bind(post.title)
            .bind(post.content)
            .bind(Json(post.tags))
            .bind(Json(post.categories))
            .bind(post.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn list_posts(&self) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts ORDER BY rowid ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(post_from_row).collect::<sqlx::Result<_>>().map_err(db_err)
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(post_from_row).transpose().map_err(db_err)
    }

    async fn create_term(&self, term: Term) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (id, title, content, posts, created_at) VALUES (?, ?, ?, ?, ?)",
            term_table(term.kind)
        );
        sqlx::query(&sql)
            .bind(term.id)
            .bind(term.title)
            .bind(term.content)
            .bind(Json(term.posts))
            .bind(term.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn get_term(&self, kind: TermKind, id: Uuid) -> Result<Option<Term>> {
        let sql = format!(
            "SELECT id, title, content, posts, created_at FROM {} WHERE id = ?",
            term_table(kind)
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref()
            .map(|row| term_from_row(kind, row))
            .transpose()
            .map_err(db_err)
    }

    async fn posts_with_term(&self, kind: TermKind, id: Uuid) -> Result<Vec<Post>> {
        // JSON arrays hold hyphenated ids, so match on the string form.
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE EXISTS (SELECT 1 FROM json_each(posts.{column}) WHERE json_each.value = ?) \
             ORDER BY rowid ASC",
            column = post_reference_column(kind)
        );
        let rows = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(post_from_row).collect::<sqlx::Result<_>>().map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo() -> SqliteBlogRepo {
        SqliteBlogRepo::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_post() {
        let repo = repo().await;
        let post = Post::new("T", "B").unwrap();
        let id = post.id;

        repo.create_post(post).await.expect("Failed to create post");

        let stored = repo.get_post(id).await.unwrap().expect("post should exist");
        assert_eq!(stored.title, "T");
        assert_eq!(stored.content, "B");
        assert!(stored.tags.is_empty());
        assert!(stored.categories.is_empty());
    }

    #[tokio::test]
    async fn test_missing_post_is_none() {
        let repo = repo().await;
        assert!(repo.get_post(Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_posts_keeps_insertion_order() {
        let repo = repo().await;
        for title in ["first", "second", "third"] {
            repo.create_post(Post::new(title, "body").unwrap()).await.unwrap();
        }

        let titles: Vec<String> = repo.list_posts().await.unwrap().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_store_rejects_empty_title() {
        let repo = repo().await;
        let mut post = Post::new("T", "B").unwrap();
        post.title = String::new();

        let err = repo.create_post(post).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_store_accepts_whitespace_title() {
        let repo = repo().await;
        let post = Post::new(" ", "B").unwrap();
        let id = post.id;

        repo.create_post(post).await.unwrap();
        assert_eq!(repo.get_post(id).await.unwrap().unwrap().title, " ");
    }

    #[tokio::test]
    async fn test_find_user_returns_first_registration() {
        let repo = repo().await;
        let first = User::new("A".into(), "x".into(), "dup".into(), "h1".into());
        let second = User::new("B".into(), "y".into(), "dup".into(), "h2".into());
        let first_id = first.id;
        repo.create_user(first).await.unwrap();
        repo.create_user(second).await.unwrap();

        let found = repo.find_user_by_username("dup").await.unwrap().unwrap();
        assert_eq!(found.id, first_id);
        assert!(repo.find_user_by_username("nobody").await.unwrap().is_none());
        assert_eq!(repo.get_user(first_id).await.unwrap().unwrap().name, "A");
    }

    #[tokio::test]
    async fn test_posts_with_term_lists_every_referencing_post() {
        let repo = repo().await;
        let tag = Term::new(TermKind::Tag, "rust", "Rust things").unwrap();
        let tag_id = tag.id;
        repo.create_term(tag).await.unwrap();

        let a = Post::with_terms("a", "a", vec![tag_id], vec![]).unwrap();
        let b = Post::with_terms("b", "b", vec![Uuid::now_v7(), tag_id], vec![]).unwrap();
        let c = Post::new("c", "c").unwrap();
        for post in [a, b, c] {
            repo.create_post(post).await.unwrap();
        }

        let titles: Vec<String> = repo
            .posts_with_term(TermKind::Tag, tag_id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, ["a", "b"]);

        // Same id in the other collection's array does not count.
        assert!(repo.posts_with_term(TermKind::Category, tag_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_terms_live_in_separate_collections() {
        let repo = repo().await;
        let category = Term::new(TermKind::Category, "news", "Announcements").unwrap();
        let id = category.id;
        repo.create_term(category).await.unwrap();

        let stored = repo.get_term(TermKind::Category, id).await.unwrap().unwrap();
        assert_eq!(stored.title, "news");
        assert_eq!(stored.kind, TermKind::Category);
        assert!(repo.get_term(TermKind::Tag, id).await.unwrap().is_none());
    }

    #[test]
    fn test_retry_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
        assert_eq!(policy.delay_after(4), Duration::from_millis(500));
        assert_eq!(policy.delay_after(40), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_connect_with_retry_gives_up() {
        let policy = RetryPolicy {
            max_attempts: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        };
        let result =
            SqliteBlogRepo::connect_with_retry("sqlite:/nonexistent-dir/deeper/blog.db", &policy).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
