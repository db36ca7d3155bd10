//! Blog post repository
//!
//! This module provides:
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait for SQLite and MySQL
//!
//! Listings are ordered by id ascending so callers see posts in the order
//! they were written.

use super::{mysql, sqlite};
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{BlogPost, Category, CreatePostInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

const POST_COLUMNS: &str =
    "id, title, image, category, summary, content, is_draft, author_id, created_at";

/// Blog post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a new post
    async fn create(&self, input: &CreatePostInput) -> Result<BlogPost>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<BlogPost>>;

    /// All posts of one author, drafts included
    async fn list_by_author(&self, author_id: i64) -> Result<Vec<BlogPost>>;

    /// All published posts across authors
    async fn list_published(&self) -> Result<Vec<BlogPost>>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, input: &CreatePostInput) -> Result<BlogPost> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_post_sqlite(sqlite(&self.pool)?, input).await,
            DatabaseDriver::Mysql => create_post_mysql(mysql(&self.pool)?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<BlogPost>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_post_by_id_sqlite(sqlite(&self.pool)?, id).await,
            DatabaseDriver::Mysql => get_post_by_id_mysql(mysql(&self.pool)?, id).await,
        }
    }

    async fn list_by_author(&self, author_id: i64) -> Result<Vec<BlogPost>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_posts_by_author_sqlite(sqlite(&self.pool)?, author_id).await
            }
            DatabaseDriver::Mysql => list_posts_by_author_mysql(mysql(&self.pool)?, author_id).await,
        }
    }

    async fn list_published(&self) -> Result<Vec<BlogPost>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_published_posts_sqlite(sqlite(&self.pool)?).await,
            DatabaseDriver::Mysql => list_published_posts_mysql(mysql(&self.pool)?).await,
        }
    }
}

fn post_from_input(id: i64, input: &CreatePostInput, created_at: chrono::DateTime<Utc>) -> BlogPost {
    BlogPost {
        id,
        title: input.title.clone(),
        image: input.image.clone(),
        category: input.category,
        summary: input.summary.clone(),
        content: input.content.clone(),
        is_draft: input.is_draft,
        author_id: input.author_id,
        created_at,
    }
}

fn parse_category(raw: &str, post_id: i64) -> Result<Category> {
    Category::from_str(raw).with_context(|| format!("Invalid category stored for post {post_id}"))
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, input: &CreatePostInput) -> Result<BlogPost> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO blog_posts (title, image, category, summary, content, is_draft, author_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.image)
    .bind(input.category.label())
    .bind(&input.summary)
    .bind(&input.content)
    .bind(input.is_draft)
    .bind(input.author_id)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create blog post")?;

    tx.commit().await.context("Failed to commit blog post")?;

    Ok(post_from_input(result.last_insert_rowid(), input, now))
}

async fn get_post_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<BlogPost>> {
    let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM blog_posts WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get blog post by ID")?;

    row.as_ref().map(row_to_post_sqlite).transpose()
}

async fn list_posts_by_author_sqlite(pool: &SqlitePool, author_id: i64) -> Result<Vec<BlogPost>> {
    let rows = sqlx::query(&format!(
        "SELECT {POST_COLUMNS} FROM blog_posts WHERE author_id = ? ORDER BY id ASC"
    ))
    .bind(author_id)
    .fetch_all(pool)
    .await
    .context("Failed to list blog posts by author")?;

    rows.iter().map(row_to_post_sqlite).collect()
}

async fn list_published_posts_sqlite(pool: &SqlitePool) -> Result<Vec<BlogPost>> {
    let rows = sqlx::query(&format!(
        "SELECT {POST_COLUMNS} FROM blog_posts WHERE is_draft = ? ORDER BY id ASC"
    ))
    .bind(false)
    .fetch_all(pool)
    .await
    .context("Failed to list published blog posts")?;

    rows.iter().map(row_to_post_sqlite).collect()
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<BlogPost> {
    let id: i64 = row.get("id");
    let category: String = row.get("category");

    Ok(BlogPost {
        id,
        title: row.get("title"),
        image: row.get("image"),
        category: parse_category(&category, id)?,
        summary: row.get("summary"),
        content: row.get("content"),
        is_draft: row.get("is_draft"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, input: &CreatePostInput) -> Result<BlogPost> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO blog_posts (title, image, category, summary, content, is_draft, author_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.image)
    .bind(input.category.label())
    .bind(&input.summary)
    .bind(&input.content)
    .bind(input.is_draft)
    .bind(input.author_id)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create blog post")?;

    tx.commit().await.context("Failed to commit blog post")?;

    Ok(post_from_input(result.last_insert_id() as i64, input, now))
}

async fn get_post_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<BlogPost>> {
    let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM blog_posts WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get blog post by ID")?;

    row.as_ref().map(row_to_post_mysql).transpose()
}

async fn list_posts_by_author_mysql(pool: &MySqlPool, author_id: i64) -> Result<Vec<BlogPost>> {
    let rows = sqlx::query(&format!(
        "SELECT {POST_COLUMNS} FROM blog_posts WHERE author_id = ? ORDER BY id ASC"
    ))
    .bind(author_id)
    .fetch_all(pool)
    .await
    .context("Failed to list blog posts by author")?;

    rows.iter().map(row_to_post_mysql).collect()
}

async fn list_published_posts_mysql(pool: &MySqlPool) -> Result<Vec<BlogPost>> {
    let rows = sqlx::query(&format!(
        "SELECT {POST_COLUMNS} FROM blog_posts WHERE is_draft = ? ORDER BY id ASC"
    ))
    .bind(false)
    .fetch_all(pool)
    .await
    .context("Failed to list published blog posts")?;

    rows.iter().map(row_to_post_mysql).collect()
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<BlogPost> {
    let id: i64 = row.get("id");
    let category: String = row.get("category");

    Ok(BlogPost {
        id,
        title: row.get("title"),
        image: row.get("image"),
        category: parse_category(&category, id)?,
        summary: row.get("summary"),
        content: row.get("content"),
        is_draft: row.get("is_draft"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
    })
}
